// ==========================================
// 线索导入系统 - 配置层
// ==========================================
// 职责: 系统配置管理（导入检查点、列数策略、分页等）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, validate_config_value, ConfigManager, ImportSettings};
pub use import_config_trait::ImportConfigReader;
