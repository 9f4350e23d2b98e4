// ==========================================
// 线索导入系统 - 导入管道存储 Repository 实现
// ==========================================
// 职责: 实现 LeadImportRepository（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据读写
// ==========================================
// 并发: Arc<Mutex<Connection>> 串行化所有读写，持锁期间不 await；
//       同一连接天然满足读己之写
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{Import, ImportPatch};
use crate::domain::lead::{match_key, CompanyPattern, Lead, ScoreBreakdown, ScoredLead};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::lead_import_repo::LeadImportRepository;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// 行映射（供各 Repository 共用）
// ==========================================

pub(crate) const LEAD_COLUMNS: &str = "id, email, firstName, lastName, company, title, phone, \
     linkedin, status, industry, seniority, emailValid, score, scoreBreakdown, nextBestAction, \
     importId, rawData, createdAt";

pub(crate) const IMPORT_COLUMNS: &str = "id, filename, status, totalRecords, processedRecords, \
     duplicatesFound, errorMessage, createdAt, completedAt";

/// 时间戳统一格式（RFC 3339，UTC，微秒），保证按文本排序即按时间排序
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}

fn parse_enum<T: std::str::FromStr<Err = String>>(field: &str, raw: &str) -> RepositoryResult<T> {
    raw.parse::<T>()
        .map_err(|message| RepositoryError::FieldValueError {
            field: field.to_string(),
            message,
        })
}

/// leads 表原始行
pub(crate) struct LeadRow {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    title: Option<String>,
    phone: Option<String>,
    linkedin: Option<String>,
    status: String,
    industry: String,
    seniority: String,
    email_valid: bool,
    score: i64,
    score_breakdown: String,
    next_best_action: String,
    import_id: String,
    raw_data: String,
    created_at: String,
}

impl LeadRow {
    /// 按 LEAD_COLUMNS 顺序读取
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            company: row.get(4)?,
            title: row.get(5)?,
            phone: row.get(6)?,
            linkedin: row.get(7)?,
            status: row.get(8)?,
            industry: row.get(9)?,
            seniority: row.get(10)?,
            email_valid: row.get(11)?,
            score: row.get(12)?,
            score_breakdown: row.get(13)?,
            next_best_action: row.get(14)?,
            import_id: row.get(15)?,
            raw_data: row.get(16)?,
            created_at: row.get(17)?,
        })
    }
}

impl TryFrom<LeadRow> for Lead {
    type Error = RepositoryError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let score_breakdown: ScoreBreakdown = serde_json::from_str(&row.score_breakdown)?;
        let raw_data: BTreeMap<String, String> = serde_json::from_str(&row.raw_data)?;

        Ok(Lead {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            company: row.company,
            title: row.title,
            phone: row.phone,
            linkedin: row.linkedin,
            status: parse_enum("status", &row.status)?,
            industry: parse_enum("industry", &row.industry)?,
            seniority: parse_enum("seniority", &row.seniority)?,
            email_valid: row.email_valid,
            score: u32::try_from(row.score).map_err(|e| RepositoryError::FieldValueError {
                field: "score".to_string(),
                message: e.to_string(),
            })?,
            score_breakdown,
            next_best_action: parse_enum("nextBestAction", &row.next_best_action)?,
            import_id: row.import_id,
            raw_data,
            created_at: parse_timestamp("createdAt", &row.created_at)?,
        })
    }
}

/// imports 表原始行
pub(crate) struct ImportRow {
    id: String,
    filename: String,
    status: String,
    total_records: i64,
    processed_records: i64,
    duplicates_found: i64,
    error_message: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl ImportRow {
    /// 按 IMPORT_COLUMNS 顺序读取
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            status: row.get(2)?,
            total_records: row.get(3)?,
            processed_records: row.get(4)?,
            duplicates_found: row.get(5)?,
            error_message: row.get(6)?,
            created_at: row.get(7)?,
            completed_at: row.get(8)?,
        })
    }
}

impl TryFrom<ImportRow> for Import {
    type Error = RepositoryError;

    fn try_from(row: ImportRow) -> Result<Self, Self::Error> {
        Ok(Import {
            id: row.id,
            filename: row.filename,
            status: parse_enum("status", &row.status)?,
            total_records: row.total_records.max(0) as u64,
            processed_records: row.processed_records.max(0) as u64,
            duplicates_found: row.duplicates_found.max(0) as u64,
            error_message: row.error_message,
            created_at: parse_timestamp("createdAt", &row.created_at)?,
            completed_at: row
                .completed_at
                .as_deref()
                .map(|raw| parse_timestamp("completedAt", raw))
                .transpose()?,
        })
    }
}

/// 按 id 读取导入批次（调用方持锁）
pub(crate) fn select_import(conn: &Connection, import_id: &str) -> RepositoryResult<Option<Import>> {
    let sql = format!("SELECT {} FROM imports WHERE id = ?1", IMPORT_COLUMNS);
    let row = conn
        .query_row(&sql, params![import_id], ImportRow::from_row)
        .optional()?;
    row.map(Import::try_from).transpose()
}

// ==========================================
// LeadImportRepositoryImpl
// ==========================================
pub struct LeadImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl LeadImportRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（需已建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_one_lead(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Option<Lead>> {
        let row = conn.query_row(sql, params, LeadRow::from_row).optional()?;
        row.map(Lead::try_from).transpose()
    }
}

#[async_trait]
impl LeadImportRepository for LeadImportRepositoryImpl {
    async fn create_import(&self, filename: &str) -> RepositoryResult<Import> {
        let import = Import::new(filename);
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO imports (
                id, filename, status, totalRecords, processedRecords,
                duplicatesFound, errorMessage, createdAt, completedAt
            ) VALUES (?1, ?2, ?3, 0, 0, 0, NULL, ?4, NULL)
            "#,
            params![
                import.id,
                import.filename,
                import.status.to_db_str(),
                format_timestamp(&import.created_at),
            ],
        )?;
        Ok(import)
    }

    async fn get_import(&self, import_id: &str) -> RepositoryResult<Option<Import>> {
        let conn = self.get_conn()?;
        select_import(&conn, import_id)
    }

    async fn update_import(&self, import_id: &str, patch: ImportPatch) -> RepositoryResult<Import> {
        let conn = self.get_conn()?;

        let target = patch
            .status
            .map(|s| s.to_db_str().to_string())
            .unwrap_or_else(|| "progress".to_string());

        let required = match patch.required_status() {
            Some(required) => required,
            None => {
                // 目标为 queued: 只能作为初始状态
                let current = select_import(&conn, import_id)?
                    .ok_or_else(|| RepositoryError::not_found("Import", import_id))?;
                return Err(RepositoryError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: target,
                });
            }
        };

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(status) = patch.status {
            assignments.push("status = ?");
            values.push(Value::Text(status.to_db_str().to_string()));
        }
        if let Some(total) = patch.total_records {
            assignments.push("totalRecords = ?");
            values.push(Value::Integer(total as i64));
        }
        if let Some(processed) = patch.processed_records {
            assignments.push("processedRecords = ?");
            values.push(Value::Integer(processed as i64));
        }
        if let Some(duplicates) = patch.duplicates_found {
            assignments.push("duplicatesFound = ?");
            values.push(Value::Integer(duplicates as i64));
        }
        if let Some(message) = &patch.error_message {
            assignments.push("errorMessage = ?");
            values.push(Value::Text(message.clone()));
        }
        if let Some(completed_at) = &patch.completed_at {
            assignments.push("completedAt = ?");
            values.push(Value::Text(format_timestamp(completed_at)));
        }

        if assignments.is_empty() {
            return select_import(&conn, import_id)?
                .ok_or_else(|| RepositoryError::not_found("Import", import_id));
        }

        // 单条 UPDATE: 前驱状态校验与写入原子完成
        let sql = format!(
            "UPDATE imports SET {} WHERE id = ? AND status = ?",
            assignments.join(", ")
        );
        values.push(Value::Text(import_id.to_string()));
        values.push(Value::Text(required.to_db_str().to_string()));

        let affected = conn.execute(&sql, params_from_iter(values.iter()))?;
        let current = select_import(&conn, import_id)?
            .ok_or_else(|| RepositoryError::not_found("Import", import_id))?;

        if affected == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: target,
            });
        }

        debug!(
            import_id = import_id,
            status = %current.status,
            processed = current.processed_records,
            duplicates = current.duplicates_found,
            "导入批次已更新"
        );
        Ok(current)
    }

    async fn create_lead(&self, lead: ScoredLead, import_id: &str) -> RepositoryResult<String> {
        let lead = Lead::from_scored(lead, import_id);
        let score_breakdown = serde_json::to_string(&lead.score_breakdown)?;
        let raw_data = serde_json::to_string(&lead.raw_data)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO leads (
                id, email, firstName, lastName, company, title, phone, linkedin,
                status, industry, seniority, emailValid, score, scoreBreakdown,
                nextBestAction, importId, rawData, createdAt,
                emailKey, firstNameKey, lastNameKey
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21
            )
            "#,
            params![
                lead.id,
                lead.email,
                lead.first_name,
                lead.last_name,
                lead.company,
                lead.title,
                lead.phone,
                lead.linkedin,
                lead.status.to_db_str(),
                lead.industry.to_db_str(),
                lead.seniority.to_db_str(),
                lead.email_valid,
                lead.score,
                score_breakdown,
                lead.next_best_action.to_db_str(),
                lead.import_id,
                raw_data,
                format_timestamp(&lead.created_at),
                lead.email.as_deref().map(match_key),
                lead.first_name.as_deref().map(match_key),
                lead.last_name.as_deref().map(match_key),
            ],
        )?;
        Ok(lead.id)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Lead>> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM leads WHERE emailKey = ?1 ORDER BY createdAt LIMIT 1",
            LEAD_COLUMNS
        );
        Self::query_one_lead(&conn, &sql, params![match_key(email)])
    }

    async fn find_by_name_and_company(
        &self,
        first_name: &str,
        last_name: &str,
        company: &CompanyPattern,
    ) -> RepositoryResult<Option<Lead>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM leads
            WHERE firstNameKey = ?1
              AND lastNameKey = ?2
              AND company IS NOT NULL
            ORDER BY createdAt
            "#,
            LEAD_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![match_key(first_name), match_key(last_name)],
            LeadRow::from_row,
        )?;

        // 公司名归一化在 SQL 之外完成
        for row in rows {
            let row = row?;
            let matched = row
                .company
                .as_deref()
                .map(|stored| company.matches(stored))
                .unwrap_or(false);
            if matched {
                return Lead::try_from(row).map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::lead::{EnrichedLead, LeadScore, RawRecord};
    use crate::domain::types::{ImportStatus, Industry, NextBestAction, Seniority};

    fn repo() -> LeadImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        LeadImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn scored(pairs: &[(&str, &str)]) -> ScoredLead {
        ScoredLead {
            enriched: EnrichedLead {
                raw: RawRecord::from_pairs(pairs),
                email_valid: true,
                industry: Industry::Technology,
                seniority: Seniority::Vp,
            },
            score: LeadScore {
                score: 42,
                score_breakdown: ScoreBreakdown {
                    email: 10,
                    title: 12,
                    company: 20,
                    ..Default::default()
                },
                next_best_action: NextBestAction::NurtureSequence,
            },
        }
    }

    #[tokio::test]
    async fn test_import_lifecycle_transitions_are_guarded() {
        let repo = repo();
        let import = repo.create_import("leads.csv").await.unwrap();
        assert_eq!(import.status, ImportStatus::Queued);

        // queued 状态下不允许只写进度
        let err = repo
            .update_import(&import.id, ImportPatch {
                processed_records: Some(3),
                ..ImportPatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

        let started = repo
            .update_import(&import.id, ImportPatch {
                status: Some(ImportStatus::Processing),
                ..ImportPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(started.status, ImportStatus::Processing);

        let progressed = repo
            .update_import(&import.id, ImportPatch {
                total_records: Some(12),
                processed_records: Some(10),
                duplicates_found: Some(2),
                ..ImportPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(progressed.processed_records, 10);
        assert_eq!(progressed.status, ImportStatus::Processing);

        let done = repo
            .update_import(&import.id, ImportPatch {
                status: Some(ImportStatus::Completed),
                processed_records: Some(12),
                completed_at: Some(Utc::now()),
                ..ImportPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(done.status, ImportStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.duplicates_found, 2);

        // 终态不可再进入
        for status in [ImportStatus::Processing, ImportStatus::Failed, ImportStatus::Queued] {
            let err = repo
                .update_import(&import.id, ImportPatch {
                    status: Some(status),
                    ..ImportPatch::default()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));
        }
        let err = repo
            .update_import(&import.id, ImportPatch {
                processed_records: Some(99),
                ..ImportPatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

        let stored = repo.get_import(&import.id).await.unwrap().unwrap();
        assert_eq!(stored.processed_records, 12);
    }

    #[tokio::test]
    async fn test_update_unknown_import_is_not_found() {
        let repo = repo();
        let err = repo
            .update_import("missing", ImportPatch {
                status: Some(ImportStatus::Processing),
                ..ImportPatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert!(repo.get_import("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_lead_round_trips_all_fields() {
        let repo = repo();
        let id = repo
            .create_lead(
                scored(&[
                    ("email", "Jane@Acme.io"),
                    ("firstName", "Jane"),
                    ("lastName", "Doe"),
                    ("company", "Acme Inc."),
                    ("Notes", "met at expo"),
                ]),
                "imp-1",
            )
            .await
            .unwrap();

        let lead = repo.find_by_email("jane@acme.IO").await.unwrap().unwrap();
        assert_eq!(lead.id, id);
        assert_eq!(lead.import_id, "imp-1");
        assert_eq!(lead.score, 42);
        assert_eq!(lead.score_breakdown.title, 12);
        assert_eq!(lead.seniority, Seniority::Vp);
        assert_eq!(lead.next_best_action, NextBestAction::NurtureSequence);
        assert_eq!(lead.raw_data.get("Notes").map(String::as_str), Some("met at expo"));
        assert!(lead.title.is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_and_company_uses_normalized_company() {
        let repo = repo();
        repo.create_lead(
            scored(&[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Acme Inc.")]),
            "imp-1",
        )
        .await
        .unwrap();

        let acme = CompanyPattern::new("acme").unwrap();
        let found = repo
            .find_by_name_and_company("JANE", "doe", &acme)
            .await
            .unwrap();
        assert!(found.is_some());

        let globex = CompanyPattern::new("Globex").unwrap();
        assert!(repo
            .find_by_name_and_company("Jane", "Doe", &globex)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_name_and_company("Janet", "Doe", &acme)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_lookups_fold_non_ascii_case() {
        let repo = repo();
        let id = repo
            .create_lead(
                scored(&[
                    ("email", "émile@société.fr"),
                    ("firstName", "Émile"),
                    ("lastName", "Müller"),
                    ("company", "Acme Inc."),
                ]),
                "imp-1",
            )
            .await
            .unwrap();

        let by_email = repo.find_by_email("ÉMILE@SOCIÉTÉ.FR").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);

        let acme = CompanyPattern::new("acme").unwrap();
        let by_name = repo
            .find_by_name_and_company("ÉMILE", "MÜLLER", &acme)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.first_name.as_deref(), Some("Émile"));
    }

    #[tokio::test]
    async fn test_blank_email_lookup_returns_none() {
        let repo = repo();
        repo.create_lead(scored(&[("firstName", "No"), ("lastName", "Mail")]), "imp-1")
            .await
            .unwrap();
        assert!(repo.find_by_email("  ").await.unwrap().is_none());
    }
}
