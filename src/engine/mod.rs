// ==========================================
// 线索导入系统 - 引擎层
// ==========================================
// 职责: 富化与评分规则（纯函数）
// 红线: 引擎不做 I/O，不拼 SQL
// ==========================================

pub mod enrichment;
pub mod scoring;

// 重导出核心引擎
pub use enrichment::{EnrichmentEngine, INDUSTRY_RULES, SENIORITY_RULES};
pub use scoring::{ScoringEngine, ACTION_THRESHOLDS, SENIORITY_WEIGHTS};
