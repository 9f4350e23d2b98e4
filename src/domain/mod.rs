// ==========================================
// 线索导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态机
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod import;
pub mod lead;
pub mod types;

// 重导出核心类型
pub use import::{Import, ImportPatch, ImportRun, InvalidTransition, RunCounters};
pub use lead::{
    match_key, normalize_company, CompanyPattern, EnrichedLead, IndustryCount, Lead, LeadFilter, LeadPage,
    LeadScore, LeadStats, Pagination, RawRecord, ScoreBreakdown, ScoreBucket, ScoredLead,
};
pub use types::{CanonicalField, ImportStatus, Industry, LeadStatus, NextBestAction, Seniority};
