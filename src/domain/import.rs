// ==========================================
// 线索导入系统 - 导入批次领域模型
// ==========================================
// Import: 持久化的导入批次（对齐 imports 表）
// ImportPatch: 部分字段更新（一次原子写入）
// ImportRun: 单次导入运行的显式状态对象（计数器 + 状态机）
// ==========================================

use crate::domain::types::ImportStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Import - 导入批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub id: String,
    pub filename: String,
    pub status: ImportStatus,
    pub total_records: u64,
    pub processed_records: u64,
    pub duplicates_found: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Import {
    /// 新建批次（queued，计数器为 0）
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            status: ImportStatus::Queued,
            total_records: 0,
            processed_records: 0,
            duplicates_found: 0,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

// ==========================================
// ImportPatch - 批次部分更新
// ==========================================
// status 为 None 表示仅更新进度（要求批次处于 processing）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPatch {
    pub status: Option<ImportStatus>,
    pub total_records: Option<u64>,
    pub processed_records: Option<u64>,
    pub duplicates_found: Option<u64>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportPatch {
    /// 写入前批次必须处于的状态
    pub fn required_status(&self) -> Option<ImportStatus> {
        match self.status {
            Some(target) => ImportStatus::required_predecessor(target),
            None => Some(ImportStatus::Processing),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ImportPatch::default()
    }
}

// ==========================================
// InvalidTransition - 非法状态转换
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("非法导入状态转换: {from} → {to}")]
pub struct InvalidTransition {
    pub from: ImportStatus,
    pub to: ImportStatus,
}

// ==========================================
// ImportRun - 导入运行状态
// ==========================================
// 由导入协调器独占持有；每次状态转换生成一个 ImportPatch，
// 通过仓储的单条 UPDATE 原子落库
#[derive(Debug, Clone)]
pub struct ImportRun {
    import_id: String,
    status: ImportStatus,
    total_records: u64,
    processed_records: u64,
    duplicates_found: u64,
    leads_created: u64,
    parse_faults: u64,
}

/// 运行计数快照（日志/返回值用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounters {
    pub total_records: u64,
    pub processed_records: u64,
    pub duplicates_found: u64,
    pub leads_created: u64,
    pub parse_faults: u64,
}

impl ImportRun {
    pub fn new(import_id: impl Into<String>) -> Self {
        Self {
            import_id: import_id.into(),
            status: ImportStatus::Queued,
            total_records: 0,
            processed_records: 0,
            duplicates_found: 0,
            leads_created: 0,
            parse_faults: 0,
        }
    }

    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    fn transition(&mut self, to: ImportStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    // ==========================================
    // 状态转换（返回需落库的补丁）
    // ==========================================

    /// queued → processing，计数器归零
    pub fn begin(&mut self) -> Result<ImportPatch, InvalidTransition> {
        self.transition(ImportStatus::Processing)?;
        Ok(ImportPatch {
            status: Some(ImportStatus::Processing),
            ..self.progress_patch()
        })
    }

    /// processing → completed（最终计数 + completedAt）
    pub fn complete(&mut self) -> Result<ImportPatch, InvalidTransition> {
        self.transition(ImportStatus::Completed)?;
        Ok(ImportPatch {
            status: Some(ImportStatus::Completed),
            completed_at: Some(Utc::now()),
            ..self.progress_patch()
        })
    }

    /// processing → failed（保留已有计数 + 错误信息；completedAt 仅在 completed 时写入）
    pub fn fail(&mut self, message: impl Into<String>) -> Result<ImportPatch, InvalidTransition> {
        self.transition(ImportStatus::Failed)?;
        Ok(ImportPatch {
            status: Some(ImportStatus::Failed),
            error_message: Some(message.into()),
            ..self.progress_patch()
        })
    }

    /// 仅进度（检查点）
    pub fn progress_patch(&self) -> ImportPatch {
        ImportPatch {
            total_records: Some(self.total_records),
            processed_records: Some(self.processed_records),
            duplicates_found: Some(self.duplicates_found),
            ..ImportPatch::default()
        }
    }

    // ==========================================
    // 计数
    // ==========================================

    /// 读到一行（含解析失败的行）
    pub fn record_read(&mut self) {
        self.total_records += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_found += 1;
        self.processed_records += 1;
    }

    pub fn record_created(&mut self) {
        self.leads_created += 1;
        self.processed_records += 1;
    }

    /// 行级解析失败：计入已处理，不落库，不计重复
    pub fn record_parse_fault(&mut self) {
        self.parse_faults += 1;
        self.processed_records += 1;
    }

    /// 已处理数是否落在检查点上
    pub fn is_checkpoint_due(&self, interval: u64) -> bool {
        interval > 0 && self.processed_records > 0 && self.processed_records % interval == 0
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            total_records: self.total_records,
            processed_records: self.processed_records,
            duplicates_found: self.duplicates_found,
            leads_created: self.leads_created,
            parse_faults: self.parse_faults,
        }
    }
}
