// ==========================================
// 线索导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 管道: 表格读取 → 富化 → 评分 → 去重 → 落库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 富化与评分规则
pub mod engine;

// 导入层 - 表格读取与导入协调
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CanonicalField, ImportStatus, Industry, LeadStatus, NextBestAction, Seniority,
};

// 领域实体
pub use domain::{EnrichedLead, Import, Lead, LeadScore, RawRecord, ScoredLead};

// 引擎
pub use engine::{EnrichmentEngine, ScoringEngine};

// 导入
pub use importer::{DuplicateDetector, ImportError, LeadImporter, LeadImporterImpl};

// API
pub use api::{DashboardApi, ImportApi, LeadApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "线索导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
