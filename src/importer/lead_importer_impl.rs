// ==========================================
// 线索导入系统 - 线索导入协调器实现
// ==========================================
// 职责: 串联读取 → 富化 → 评分 → 去重 → 落库，维护批次状态机
// 状态: queued → processing → {completed | failed}
// ==========================================
// 顺序: 单批次内严格按输入顺序串行处理（去重依赖前序行已落库）
// 检查点: 后台写入，同一时刻最多一个在途（其间到期者合并）；终态写入前全部落地
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{Import, ImportPatch, ImportRun};
use crate::domain::lead::RawRecord;
use crate::engine::{EnrichmentEngine, ScoringEngine};
use crate::importer::duplicate_detector::DuplicateDetector;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{open_record_source, RowLengthPolicy};
use crate::importer::lead_importer_trait::LeadImporter;
use crate::repository::error::RepositoryError;
use crate::repository::lead_import_repo::LeadImportRepository;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// 批次生命周期相关的仓储错误转为导入错误
fn lifecycle_error(err: RepositoryError) -> ImportError {
    match err {
        RepositoryError::NotFound { id, .. } => ImportError::ImportNotFound(id),
        RepositoryError::InvalidStateTransition { from, to } => {
            ImportError::InvalidStateTransition { from, to }
        }
        other => ImportError::Storage(other),
    }
}

// ==========================================
// ProgressCheckpointer - 进度检查点
// ==========================================
// 同一时刻最多一个写入在途；在途期间到期的检查点合并为最新一份，
// 在途写入结束后的下一次提交或 drain 时落库
struct ProgressCheckpointer<R>
where
    R: LeadImportRepository + 'static,
{
    repo: Arc<R>,
    in_flight: Option<JoinHandle<()>>,
    pending: Option<(String, ImportPatch)>,
    written: u64,
    coalesced: u64,
}

impl<R> ProgressCheckpointer<R>
where
    R: LeadImportRepository + 'static,
{
    fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            in_flight: None,
            pending: None,
            written: 0,
            coalesced: 0,
        }
    }

    /// 提交检查点（不等待写入结果）
    ///
    /// 派发后让出一次执行权，使单线程运行时下写入任务也能及时执行
    async fn submit(&mut self, import_id: &str, patch: ImportPatch) {
        if self.in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
            if self.pending.replace((import_id.to_string(), patch)).is_some() {
                self.coalesced += 1;
            }
            debug!(import_id = %import_id, "上一个检查点仍在写入，暂存本次");
            return;
        }

        // 暂存的旧检查点已被本次覆盖
        if self.pending.take().is_some() {
            self.coalesced += 1;
        }
        self.spawn_write(import_id.to_string(), patch);
        tokio::task::yield_now().await;
    }

    fn spawn_write(&mut self, import_id: String, patch: ImportPatch) {
        let repo = Arc::clone(&self.repo);
        self.written += 1;
        self.in_flight = Some(tokio::spawn(async move {
            if let Err(e) = repo.update_import(&import_id, patch).await {
                warn!(import_id = %import_id, error = %e, "检查点写入失败");
            }
        }));
    }

    /// 等待在途检查点落地，再写入暂存的最新检查点
    async fn drain(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "检查点任务异常退出");
            }
        }
        if let Some((import_id, patch)) = self.pending.take() {
            self.written += 1;
            if let Err(e) = self.repo.update_import(&import_id, patch).await {
                warn!(import_id = %import_id, error = %e, "检查点写入失败");
            }
        }
    }
}

// ==========================================
// LeadImporterImpl - 线索导入协调器
// ==========================================
pub struct LeadImporterImpl<R, C>
where
    R: LeadImportRepository + 'static,
    C: ImportConfigReader,
{
    // 数据访问层（检查点任务共享）
    repo: Arc<R>,

    // 配置读取器
    config: C,

    // 管道组件
    enrichment: EnrichmentEngine,
    scoring: ScoringEngine,
    detector: DuplicateDetector,
}

impl<R, C> LeadImporterImpl<R, C>
where
    R: LeadImportRepository + 'static,
    C: ImportConfigReader,
{
    /// 创建新的 LeadImporter 实例
    ///
    /// # 参数
    /// - repo: 导入管道存储
    /// - config: 配置读取器
    pub fn new(repo: Arc<R>, config: C) -> Self {
        Self {
            repo,
            config,
            enrichment: EnrichmentEngine::new(),
            scoring: ScoringEngine::new(),
            detector: DuplicateDetector::new(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// 逐行处理整个源文件，返回首个致命错误
    async fn process_records(
        &self,
        run: &mut ImportRun,
        file_path: &Path,
        policy: RowLengthPolicy,
        interval: u64,
        cancel: Option<&CancellationToken>,
        checkpointer: &mut ProgressCheckpointer<R>,
    ) -> ImportResult<()> {
        let source = open_record_source(file_path, policy)?;

        for item in source {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(ImportError::Cancelled);
            }

            match item {
                Ok(record) => {
                    run.record_read();
                    self.process_record(run, record).await?;
                }
                Err(e) if e.is_row_fault() => {
                    run.record_read();
                    run.record_parse_fault();
                    warn!(import_id = %run.import_id(), error = %e, "行解析失败，跳过");
                }
                Err(e) => return Err(e),
            }

            if run.is_checkpoint_due(interval) {
                checkpointer
                    .submit(run.import_id(), run.progress_patch())
                    .await;
            }
        }

        Ok(())
    }

    /// 单行: 富化 → 评分 → 去重 → 落库
    ///
    /// 存储失败直接返回，该行不计入已处理
    async fn process_record(&self, run: &mut ImportRun, record: RawRecord) -> ImportResult<()> {
        let row = record.row_number;
        let enriched = self.enrichment.enrich(record);
        let scored = self.scoring.score_lead(enriched);

        if let Some(duplicate) = self
            .detector
            .find_duplicate(self.repo.as_ref(), &scored.enriched)
            .await?
        {
            debug!(
                row,
                existing_lead = %duplicate.lead_id,
                rule = %duplicate.rule,
                "重复线索，跳过落库"
            );
            run.record_duplicate();
            return Ok(());
        }

        let score = scored.score.score;
        let lead_id = self.repo.create_lead(scored, run.import_id()).await?;
        run.record_created();
        debug!(row, lead_id = %lead_id, score, "线索已创建");
        Ok(())
    }
}

#[async_trait]
impl<R, C> LeadImporter for LeadImporterImpl<R, C>
where
    R: LeadImportRepository + 'static,
    C: ImportConfigReader,
{
    #[instrument(skip(self, file_path, cancel))]
    async fn run_import(
        &self,
        import_id: &str,
        file_path: &Path,
        cancel: Option<CancellationToken>,
    ) -> ImportResult<Import> {
        let start_time = Instant::now();

        // === 启动前: 读取配置（失败不改变批次状态） ===
        let interval = self.config.get_checkpoint_interval().await?;
        let policy = self.config.get_row_length_policy().await?;

        // === queued → processing ===
        let mut run = ImportRun::new(import_id);
        let begin = run.begin()?;
        self.repo
            .update_import(import_id, begin)
            .await
            .map_err(lifecycle_error)?;
        info!(
            file_path = %file_path.display(),
            checkpoint_interval = interval,
            row_length_policy = %policy,
            "开始导入线索"
        );

        // === 逐行处理 ===
        let mut checkpointer = ProgressCheckpointer::new(Arc::clone(&self.repo));
        let outcome = self
            .process_records(
                &mut run,
                file_path,
                policy,
                interval,
                cancel.as_ref(),
                &mut checkpointer,
            )
            .await;
        checkpointer.drain().await;

        // === 终态写入 ===
        let terminal = match &outcome {
            Ok(()) => run.complete()?,
            Err(e) => {
                error!(error = %e, fault_kind = ?e.fault_kind(), "导入失败");
                run.fail(e.to_string())?
            }
        };
        let import = self
            .repo
            .update_import(import_id, terminal)
            .await
            .map_err(lifecycle_error)?;

        let counters = run.counters();
        info!(
            status = %import.status,
            total_records = counters.total_records,
            processed_records = counters.processed_records,
            duplicates_found = counters.duplicates_found,
            leads_created = counters.leads_created,
            parse_faults = counters.parse_faults,
            checkpoints_written = checkpointer.written,
            checkpoints_coalesced = checkpointer.coalesced,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入结束"
        );
        Ok(import)
    }

    async fn import_file(&self, file_path: &Path) -> ImportResult<Import> {
        let filename = file_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| file_path.display().to_string());

        let import = self.repo.create_import(&filename).await?;
        self.run_import(&import.id, file_path, None).await
    }

    async fn batch_import(&self, file_paths: Vec<PathBuf>) -> Vec<ImportResult<Import>> {
        info!(file_count = file_paths.len(), "开始批量导入");
        let tasks = file_paths.iter().map(|path| self.import_file(path));
        join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::db::init_schema;
    use crate::domain::types::ImportStatus;
    use crate::repository::lead_import_repo_impl::LeadImportRepositoryImpl;
    use rusqlite::Connection;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    fn importer(settings: ImportSettings) -> LeadImporterImpl<LeadImportRepositoryImpl, ImportSettings> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = LeadImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)));
        LeadImporterImpl::new(Arc::new(repo), settings)
    }

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_fuzzy_duplicates_inside_one_batch() {
        let importer = importer(ImportSettings::default());
        let file = csv_file(
            "First Name,Last Name,Company\n\
             Jane,Doe,Acme Inc.\n\
             jane,DOE,acme\n\
             Jane,Doe,Globex\n",
        );

        let import = importer.import_file(file.path()).await.unwrap();
        assert_eq!(import.status, ImportStatus::Completed);
        assert_eq!(import.total_records, 3);
        assert_eq!(import.processed_records, 3);
        assert_eq!(import.duplicates_found, 1);
    }

    #[tokio::test]
    async fn test_row_faults_count_as_processed_only() {
        let importer = importer(ImportSettings {
            checkpoint_interval: 2,
            row_length_policy: RowLengthPolicy::Skip,
        });
        let file = csv_file(
            "email,company\n\
             a@x.com,Acme\n\
             b@x.com,Acme,extra\n\
             c@x.com,Acme\n",
        );

        let import = importer.import_file(file.path()).await.unwrap();
        assert_eq!(import.status, ImportStatus::Completed);
        assert_eq!(import.total_records, 3);
        assert_eq!(import.processed_records, 3);
        assert_eq!(import.duplicates_found, 0);
        assert!(importer
            .repository()
            .find_by_email("b@x.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_terminal_import_cannot_run_again() {
        let importer = importer(ImportSettings::default());
        let file = csv_file("email\na@x.com\n");

        let import = importer.import_file(file.path()).await.unwrap();
        assert_eq!(import.status, ImportStatus::Completed);

        let rerun = importer.run_import(&import.id, file.path(), None).await;
        assert!(matches!(
            rerun,
            Err(ImportError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_import_id() {
        let importer = importer(ImportSettings::default());
        let file = csv_file("email\na@x.com\n");
        assert!(matches!(
            importer.run_import("missing", file.path(), None).await,
            Err(ImportError::ImportNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_leaves_import_queued() {
        let importer = importer(ImportSettings {
            checkpoint_interval: 0,
            ..ImportSettings::default()
        });
        let file = csv_file("email\na@x.com\n");
        let import = importer.repository().create_import("a.csv").await.unwrap();

        assert!(importer
            .run_import(&import.id, file.path(), None)
            .await
            .is_err());
        let stored = importer.repository().get_import(&import.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ImportStatus::Queued);
    }
}
