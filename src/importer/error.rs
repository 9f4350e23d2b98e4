// ==========================================
// 线索导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 故障分类（fault_kind）:
// - Io: 输入不可打开/不可读，整次导入失败
// - Parse: 行级解析失败，计入已处理后继续
// - Storage: 仓储读写失败，整次导入失败
// - Lifecycle: 批次不存在/非法状态转换/取消
// ==========================================

use crate::domain::import::InvalidTransition;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.tsv/.txt/.xlsx/.xls/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 行级错误 =====
    #[error("列数不一致 (行 {row}): 期望 {expected} 列，实际 {found} 列")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("行解析失败 (行 {row}): {message}")]
    RowParseError { row: usize, message: String },

    // ===== 存储错误 =====
    #[error("存储失败: {0}")]
    Storage(#[from] RepositoryError),

    // ===== 生命周期错误 =====
    #[error("导入批次不存在: {0}")]
    ImportNotFound(String),

    #[error("非法导入状态转换: {from} → {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("导入已取消")]
    Cancelled,

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 故障分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Io,
    Parse,
    Storage,
    Lifecycle,
    Other,
}

impl ImportError {
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            ImportError::FileNotFound(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_) => FaultKind::Io,
            ImportError::CsvParseError(_)
            | ImportError::RowLengthMismatch { .. }
            | ImportError::RowParseError { .. } => FaultKind::Parse,
            ImportError::Storage(_) => FaultKind::Storage,
            ImportError::ImportNotFound(_)
            | ImportError::InvalidStateTransition { .. }
            | ImportError::Cancelled => FaultKind::Lifecycle,
            ImportError::ConfigReadError { .. }
            | ImportError::ConfigValueError { .. }
            | ImportError::InternalError(_)
            | ImportError::Other(_) => FaultKind::Other,
        }
    }

    /// 行级故障：计入已处理后继续
    pub fn is_row_fault(&self) -> bool {
        self.fault_kind() == FaultKind::Parse
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
// 底层 I/O 失败属于整次导入失败，其余视为行级解析失败
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => ImportError::FileReadError(err.to_string()),
            _ => ImportError::CsvParseError(err.to_string()),
        }
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<InvalidTransition> for ImportError {
    fn from(err: InvalidTransition) -> Self {
        ImportError::InvalidStateTransition {
            from: err.from.to_string(),
            to: err.to.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
