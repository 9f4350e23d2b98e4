// ==========================================
// 线索导入系统 - 导入 API
// ==========================================
// 职责: 导入批次的创建、后台运行、查询、删除
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::import::Import;
use crate::importer::{ImportResult, LeadImporter, LeadImporterImpl};
use crate::repository::{ImportRepository, LeadImportRepository, LeadImportRepositoryImpl};

/// 默认装配的导入协调器
pub type DefaultLeadImporter = LeadImporterImpl<LeadImportRepositoryImpl, ConfigManager>;

/// 已在后台启动的导入
///
/// `import` 为创建时的快照（queued），最新进度通过 `ImportApi::get_import` 轮询
pub struct StartedImport {
    pub import: Import,
    pub task: JoinHandle<ImportResult<Import>>,
}

// ==========================================
// ImportApi - 导入 API
// ==========================================
pub struct ImportApi {
    importer: Arc<DefaultLeadImporter>,
    import_repo: Arc<ImportRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(
        importer: Arc<DefaultLeadImporter>,
        import_repo: Arc<ImportRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            importer,
            import_repo,
            config_manager,
        }
    }

    fn display_name(file_path: &Path) -> ApiResult<String> {
        file_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                ApiError::InvalidInput(format!("无效的文件路径: {}", file_path.display()))
            })
    }

    /// 创建导入批次（queued）
    pub async fn create_import(&self, filename: &str) -> ApiResult<Import> {
        if filename.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件名不能为空".to_string()));
        }
        Ok(self.importer.repository().create_import(filename.trim()).await?)
    }

    /// 创建批次并在后台运行，立即返回
    ///
    /// # 参数
    /// - file_path: 源文件路径
    /// - cancel: 可选取消信号
    pub async fn start_import(
        &self,
        file_path: &Path,
        cancel: Option<CancellationToken>,
    ) -> ApiResult<StartedImport> {
        let filename = Self::display_name(file_path)?;
        let import = self.create_import(&filename).await?;

        let importer = Arc::clone(&self.importer);
        let import_id = import.id.clone();
        let path: PathBuf = file_path.to_path_buf();
        let task = tokio::spawn(async move { importer.run_import(&import_id, &path, cancel).await });

        info!(import_id = %import.id, filename = %filename, "导入已在后台启动");
        Ok(StartedImport { import, task })
    }

    /// 逐个启动多个文件的后台导入
    ///
    /// 某个文件启动失败不影响其余文件；已启动的任务全部返回，由调用方等待
    ///
    /// # 返回
    /// - .0: 已启动的导入（与输入顺序一致）
    /// - .1: 启动失败的文件及原因
    pub async fn start_imports(
        &self,
        file_paths: &[PathBuf],
        cancel: Option<&CancellationToken>,
    ) -> (Vec<StartedImport>, Vec<(PathBuf, ApiError)>) {
        let mut started = Vec::with_capacity(file_paths.len());
        let mut rejected = Vec::new();
        for path in file_paths {
            match self
                .start_import(path, cancel.map(CancellationToken::child_token))
                .await
            {
                Ok(handle) => started.push(handle),
                Err(e) => {
                    warn!(file_path = %path.display(), error = %e, "导入启动失败");
                    rejected.push((path.clone(), e));
                }
            }
        }
        (started, rejected)
    }

    /// 创建批次并运行到终态
    pub async fn import_file(&self, file_path: &Path) -> ApiResult<Import> {
        Self::display_name(file_path)?;
        Ok(self.importer.import_file(file_path).await?)
    }

    /// 并发导入多个文件（各自独立成批）
    pub async fn batch_import(&self, file_paths: Vec<PathBuf>) -> Vec<ApiResult<Import>> {
        self.importer
            .batch_import(file_paths)
            .await
            .into_iter()
            .map(|result| result.map_err(ApiError::from))
            .collect()
    }

    /// 查询导入批次
    pub fn get_import(&self, import_id: &str) -> ApiResult<Import> {
        self.import_repo
            .find_by_id(import_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Import(id={})不存在", import_id)))
    }

    /// 最近导入列表（limit 缺省取配置 import.recent_limit）
    pub fn list_recent_imports(&self, limit: Option<u32>) -> ApiResult<Vec<Import>> {
        let limit = match limit {
            Some(0) => return Err(ApiError::InvalidInput("limit 必须 ≥ 1".to_string())),
            Some(limit) => limit,
            None => self.config_manager.get_recent_import_limit()?,
        };
        Ok(self.import_repo.list_recent(limit)?)
    }

    /// 删除导入批次记录（其线索保留）
    pub fn delete_import(&self, import_id: &str) -> ApiResult<()> {
        self.import_repo.delete(import_id)?;
        info!(import_id = %import_id, "导入批次已删除");
        Ok(())
    }
}
