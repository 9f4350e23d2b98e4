// ==========================================
// 线索导入系统 - 表格读取器
// ==========================================
// 支持: CSV (.csv/.txt/无扩展名) / TSV (.tsv) / Excel (.xlsx/.xlsm/.xls/.ods)
// 输出: 惰性、有限、不可重启的 RawRecord 序列
// ==========================================
// 行处理:
// - 空行、所有单元格为空的行跳过
// - 表头经列名归一化；单元格去首尾空白
// - 列数不一致按 RowLengthPolicy 处理（补齐 / 报告行级故障）
// - 底层读取失败为终止性错误，之后序列结束
// ==========================================

use crate::domain::lead::RawRecord;
use crate::importer::column_normalizer::normalize_column_name;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ByteRecord, ReaderBuilder};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// 记录序列（导入协调器唯一的输入）
pub type RecordSource = Box<dyn Iterator<Item = ImportResult<RawRecord>> + Send>;

// ==========================================
// RowLengthPolicy - 列数不一致处理策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLengthPolicy {
    /// 缺失的尾部单元格补空串，多出的单元格丢弃
    #[default]
    Pad,
    /// 报告 RowLengthMismatch，继续读取下一行
    Skip,
}

impl RowLengthPolicy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RowLengthPolicy::Pad => "PAD",
            RowLengthPolicy::Skip => "SKIP",
        }
    }
}

impl fmt::Display for RowLengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for RowLengthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PAD" => Ok(RowLengthPolicy::Pad),
            "SKIP" => Ok(RowLengthPolicy::Skip),
            other => Err(format!("未知列数策略: {}（可选 PAD/SKIP）", other)),
        }
    }
}

// ==========================================
// RowAssembler - 行 → RawRecord
// ==========================================
// CSV 与 Excel 共用
struct RowAssembler {
    headers: Vec<String>,
    policy: RowLengthPolicy,
}

impl RowAssembler {
    fn new<I>(raw_headers: I, policy: RowLengthPolicy) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let headers = raw_headers
            .into_iter()
            .map(|h| normalize_column_name(h.trim_start_matches('\u{feff}').trim()))
            .collect();
        Self { headers, policy }
    }

    /// 组装一行
    ///
    /// # 返回
    /// - None: 空行（跳过）
    /// - Some(Err): 行级故障（仅 Skip 策略）
    fn assemble(&self, row_number: usize, mut cells: Vec<String>) -> Option<ImportResult<RawRecord>> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }

        // 表头之外的空白尾部单元格不算列数不一致
        while cells.len() > self.headers.len()
            && cells.last().map(|c| c.trim().is_empty()).unwrap_or(false)
        {
            cells.pop();
        }

        if cells.len() != self.headers.len() {
            match self.policy {
                RowLengthPolicy::Skip => {
                    return Some(Err(ImportError::RowLengthMismatch {
                        row: row_number,
                        expected: self.headers.len(),
                        found: cells.len(),
                    }));
                }
                RowLengthPolicy::Pad => {
                    warn!(
                        row = row_number,
                        expected = self.headers.len(),
                        found = cells.len(),
                        "列数不一致，按表头补齐/截断"
                    );
                    cells.resize(self.headers.len(), String::new());
                }
            }
        }

        let mut record = RawRecord::new(row_number);
        for (header, cell) in self.headers.iter().zip(cells) {
            if header.is_empty() {
                continue;
            }
            let value = cell.trim().to_string();
            // 归一化后同名的列: 首个非空值生效
            record
                .fields
                .entry(header.clone())
                .and_modify(|existing| {
                    if existing.is_empty() {
                        *existing = value.clone();
                    }
                })
                .or_insert(value);
        }
        Some(Ok(record))
    }
}

// ==========================================
// CsvRecordReader - 分隔符文本读取器
// ==========================================
pub struct CsvRecordReader<R: Read> {
    reader: csv::Reader<R>,
    assembler: RowAssembler,
    buffer: ByteRecord,
    finished: bool,
}

impl<R: Read> CsvRecordReader<R> {
    /// 读取表头并构造读取器
    ///
    /// # 错误
    /// - 表头读取失败（I/O）
    pub fn new(source: R, delimiter: u8, policy: RowLengthPolicy) -> ImportResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 列数不一致交给 RowLengthPolicy
            .delimiter(delimiter)
            .from_reader(source);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        debug!(columns = headers.len(), "CSV 表头已读取");

        Ok(Self {
            reader,
            assembler: RowAssembler::new(headers, policy),
            buffer: ByteRecord::new(),
            finished: false,
        })
    }
}

impl<R: Read> Iterator for CsvRecordReader<R> {
    type Item = ImportResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            match self.reader.read_byte_record(&mut self.buffer) {
                Ok(false) => {
                    self.finished = true;
                    return None;
                }
                Ok(true) => {
                    let row_number = self
                        .buffer
                        .position()
                        .map(|p| p.line() as usize)
                        .unwrap_or(0);
                    let cells = self
                        .buffer
                        .iter()
                        .map(|c| String::from_utf8_lossy(c).into_owned())
                        .collect();
                    if let Some(item) = self.assembler.assemble(row_number, cells) {
                        return Some(item);
                    }
                }
                Err(err) => {
                    let err = ImportError::from(err);
                    if !err.is_row_fault() {
                        self.finished = true;
                    }
                    return Some(Err(err));
                }
            }
        }
    }
}

// ==========================================
// ExcelRecordReader - 工作簿读取器（第一个工作表）
// ==========================================
pub struct ExcelRecordReader {
    range: Range<Data>,
    assembler: RowAssembler,
    next_row: usize,
    first_row: usize, // 工作表中的绝对起始行（用于行号）
}

impl ExcelRecordReader {
    pub fn open(path: &Path, policy: RowLengthPolicy) -> ImportResult<Self> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("工作簿无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        Ok(Self::from_range(range, policy))
    }

    pub fn from_range(range: Range<Data>, policy: RowLengthPolicy) -> Self {
        let headers: Vec<String> = (0..range.width())
            .map(|col| cell_text(range.get((0, col))))
            .collect();
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        Self {
            assembler: RowAssembler::new(headers, policy),
            range,
            next_row: 1,
            first_row,
        }
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    cell.map(|c| c.to_string()).unwrap_or_default()
}

impl Iterator for ExcelRecordReader {
    type Item = ImportResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_row < self.range.height() {
            let row = self.next_row;
            self.next_row += 1;

            let cells = (0..self.range.width())
                .map(|col| cell_text(self.range.get((row, col))))
                .collect();
            // 行号从 1 开始，与电子表格一致
            if let Some(item) = self.assembler.assemble(self.first_row + row + 1, cells) {
                return Some(item);
            }
        }
        None
    }
}

// ==========================================
// 按扩展名打开记录序列
// ==========================================
pub fn open_record_source(path: &Path, policy: RowLengthPolicy) -> ImportResult<RecordSource> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" | "txt" | "" => {
            let file = File::open(path)?;
            Ok(Box::new(CsvRecordReader::new(file, b',', policy)?))
        }
        "tsv" => {
            let file = File::open(path)?;
            Ok(Box::new(CsvRecordReader::new(file, b'\t', policy)?))
        }
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(Box::new(ExcelRecordReader::open(path, policy)?)),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}
