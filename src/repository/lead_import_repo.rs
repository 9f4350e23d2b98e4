// ==========================================
// 线索导入系统 - 导入管道存储 Repository Trait
// ==========================================
// 职责: 定义导入管道所需的最小存储能力（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据读写
// ==========================================
// 一致性要求:
// - 读己之写: create_lead 返回后，find_by_* 必须能读到该线索
// - update_import 为单条原子写入，并校验前驱状态
// ==========================================

use crate::domain::import::{Import, ImportPatch};
use crate::domain::lead::{CompanyPattern, Lead, ScoredLead};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// LeadImportRepository Trait
// ==========================================
// 实现者: LeadImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait LeadImportRepository: Send + Sync {
    // ===== 导入批次 =====

    /// 创建导入批次（queued）
    async fn create_import(&self, filename: &str) -> RepositoryResult<Import>;

    /// 按 id 查询导入批次
    async fn get_import(&self, import_id: &str) -> RepositoryResult<Option<Import>>;

    /// 部分更新导入批次（单条原子写入）
    ///
    /// # 前驱状态
    /// - status=processing: 要求当前为 queued
    /// - status=completed/failed 或仅进度: 要求当前为 processing
    ///
    /// # 返回
    /// - Ok(Import): 更新后的批次
    /// - Err(NotFound): 批次不存在
    /// - Err(InvalidStateTransition): 当前状态不满足前驱要求
    async fn update_import(&self, import_id: &str, patch: ImportPatch) -> RepositoryResult<Import>;

    // ===== 线索 =====

    /// 创建线索（状态 new），返回线索 id
    async fn create_lead(&self, lead: ScoredLead, import_id: &str) -> RepositoryResult<String>;

    /// 按邮箱查询（不区分大小写）
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Lead>>;

    /// 按姓名 + 公司模式查询
    ///
    /// # 匹配
    /// - firstName / lastName 全等（不区分大小写）
    /// - company 经归一化后与模式双向子串匹配
    async fn find_by_name_and_company(
        &self,
        first_name: &str,
        last_name: &str,
        company: &CompanyPattern,
    ) -> RepositoryResult<Option<Lead>>;
}
