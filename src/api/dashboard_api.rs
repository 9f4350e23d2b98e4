// ==========================================
// 线索导入系统 - 驾驶舱 API
// ==========================================
// 职责: 线索总览统计
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::domain::lead::LeadStats;
use crate::repository::LeadRepository;

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    lead_repo: Arc<LeadRepository>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(lead_repo: Arc<LeadRepository>) -> Self {
        Self { lead_repo }
    }

    /// 统计总览
    ///
    /// # 返回
    /// - totalLeads / totalImports / averageScore（无线索时为 0）
    /// - scoreDistribution: 固定四个分数段，空段 count 为 0
    /// - topIndustries: 前 5 个行业（同数按名称）
    pub fn get_stats(&self) -> ApiResult<LeadStats> {
        Ok(self.lead_repo.stats()?)
    }
}
