// ==========================================
// 线索导入系统 - 导入层
// ==========================================
// 职责: 外部表格数据导入，生成线索
// 支持: CSV, TSV, Excel/ODS
// 管道: 列名归一化 → 读取 → 富化 → 评分 → 去重 → 落库
// ==========================================

// 模块声明
pub mod column_normalizer;
pub mod duplicate_detector;
pub mod error;
pub mod file_parser;
pub mod lead_importer_impl;
pub mod lead_importer_trait;

// 重导出核心类型
pub use column_normalizer::{canonical_field, normalize_column_name, COLUMN_SYNONYMS};
pub use duplicate_detector::{DuplicateDetector, DuplicateMatch, DuplicateRule};
pub use error::{FaultKind, ImportError, ImportResult};
pub use file_parser::{
    open_record_source, CsvRecordReader, ExcelRecordReader, RecordSource, RowLengthPolicy,
};
pub use lead_importer_impl::LeadImporterImpl;
pub use lead_importer_trait::LeadImporter;
