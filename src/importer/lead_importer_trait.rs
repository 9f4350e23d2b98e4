// ==========================================
// 线索导入系统 - 线索导入 Trait
// ==========================================
// 职责: 定义导入协调器接口（不包含实现）
// ==========================================

use crate::domain::import::Import;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

// ==========================================
// LeadImporter Trait
// ==========================================
// 用途: 导入协调器主接口
// 实现者: LeadImporterImpl
#[async_trait]
pub trait LeadImporter: Send + Sync {
    /// 运行一个已创建（queued）的导入批次
    ///
    /// # 参数
    /// - import_id: 批次 id
    /// - file_path: 源文件路径
    /// - cancel: 可选取消信号（每行处理前检查）
    ///
    /// # 返回
    /// - Ok(Import): 终态批次（completed 或 failed）
    /// - Err: 启动前失败（批次不存在、状态不允许、配置错误）或终态写入失败
    ///
    /// # 流程
    /// 1. queued → processing
    /// 2. 逐行: 富化 → 评分 → 去重 → 落库
    /// 3. 每 N 条写检查点（不阻塞处理）
    /// 4. 终态写入（等待完成）
    async fn run_import(
        &self,
        import_id: &str,
        file_path: &Path,
        cancel: Option<CancellationToken>,
    ) -> ImportResult<Import>;

    /// 创建批次并立即运行
    async fn import_file(&self, file_path: &Path) -> ImportResult<Import>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件一个独立批次，互不影响
    /// - 结果顺序与输入顺序一致
    async fn batch_import(&self, file_paths: Vec<PathBuf>) -> Vec<ImportResult<Import>>;
}
