// ==========================================
// 线索导入系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行调用
// ==========================================

pub mod error;
pub mod config_api;
pub mod dashboard_api;
pub mod import_api;
pub mod lead_api;
pub mod lead_export;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use config_api::{ConfigApi, ConfigItem};
pub use dashboard_api::DashboardApi;
pub use import_api::{DefaultLeadImporter, ImportApi, StartedImport};
pub use lead_api::LeadApi;
pub use lead_export::{export_to_string, rating, write_leads, ExportFormat};
