// ==========================================
// 线索导入系统 - 线索 API
// ==========================================
// 职责: 线索列表/详情、状态维护、导出
// ==========================================

use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::lead_export::{export_to_string, ExportFormat};
use crate::config::config_manager::{ConfigManager, MAX_PAGE_SIZE};
use crate::domain::lead::{Lead, LeadFilter, LeadPage, Pagination};
use crate::domain::types::LeadStatus;
use crate::repository::LeadRepository;

// ==========================================
// LeadApi - 线索 API
// ==========================================
pub struct LeadApi {
    lead_repo: Arc<LeadRepository>,
    config_manager: Arc<ConfigManager>,
}

impl LeadApi {
    /// 创建新的LeadApi实例
    pub fn new(lead_repo: Arc<LeadRepository>, config_manager: Arc<ConfigManager>) -> Self {
        Self {
            lead_repo,
            config_manager,
        }
    }

    /// 过滤 + 分页查询
    ///
    /// # 参数
    /// - filter.page: 从 1 开始，缺省 1
    /// - filter.limit: 1..=500，缺省取配置 lead.default_page_size
    ///
    /// # 返回
    /// - Err(InvalidInput): page/limit 越界，或 minScore > maxScore
    pub fn list_leads(&self, filter: &LeadFilter) -> ApiResult<LeadPage> {
        let page = filter.page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::InvalidInput("page 从 1 开始".to_string()));
        }

        let limit = match filter.limit {
            Some(limit) if limit == 0 || limit > MAX_PAGE_SIZE => {
                return Err(ApiError::InvalidInput(format!(
                    "limit 必须在 1..={} 之间",
                    MAX_PAGE_SIZE
                )))
            }
            Some(limit) => limit,
            None => self.config_manager.get_default_page_size()?,
        };

        if let (Some(min), Some(max)) = (filter.min_score, filter.max_score) {
            if min > max {
                return Err(ApiError::InvalidInput(format!(
                    "minScore({}) 不能大于 maxScore({})",
                    min, max
                )));
            }
        }

        let (leads, total) = self.lead_repo.query(filter, page, limit)?;
        Ok(LeadPage {
            leads,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// 线索详情
    pub fn get_lead(&self, lead_id: &str) -> ApiResult<Lead> {
        self.lead_repo
            .find_by_id(lead_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Lead(id={})不存在", lead_id)))
    }

    /// 更新单条线索状态，返回更新后的线索
    pub fn update_lead_status(&self, lead_id: &str, status: LeadStatus) -> ApiResult<Lead> {
        self.lead_repo.update_status(lead_id, status)?;
        info!(lead_id = %lead_id, status = %status, "线索状态已更新");
        self.get_lead(lead_id)
    }

    /// 批量更新线索状态
    ///
    /// # 返回
    /// - Ok(usize): 实际更新条数（未知 id 忽略）
    pub fn bulk_update_status(&self, lead_ids: &[String], status: LeadStatus) -> ApiResult<usize> {
        if lead_ids.is_empty() {
            return Err(ApiError::InvalidInput("线索ID列表不能为空".to_string()));
        }

        let updated = self.lead_repo.bulk_update_status(lead_ids, status)?;
        info!(
            requested = lead_ids.len(),
            updated,
            status = %status,
            "批量更新线索状态"
        );
        Ok(updated)
    }

    /// 导出 CSV
    ///
    /// # 参数
    /// - lead_ids: None 导出全部，Some 导出指定线索
    pub fn export_leads(
        &self,
        format: ExportFormat,
        lead_ids: Option<&[String]>,
    ) -> ApiResult<String> {
        let leads = self.lead_repo.list_for_export(lead_ids)?;
        let csv = export_to_string(format, &leads)?;
        info!(format = %format, exported = leads.len(), "线索已导出");
        Ok(csv)
    }
}
