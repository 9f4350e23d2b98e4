// ==========================================
// 线索导入系统 - 线索数据仓储
// ==========================================
// 职责: 线索查询/分页/状态维护/导出/统计（导入管道之外的管理能力）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::lead::{IndustryCount, Lead, LeadFilter, LeadStats, ScoreBucket};
use crate::domain::types::LeadStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::lead_import_repo_impl::{LeadRow, LEAD_COLUMNS};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 分数段（闭区间）
pub const SCORE_BUCKETS: [(u32, u32); 4] = [(0, 39), (40, 59), (60, 79), (80, 100)];

/// 行业排行条数
pub const TOP_INDUSTRY_LIMIT: usize = 5;

/// LIKE 通配符转义
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// 由过滤条件构造 WHERE 子句与参数
fn build_filter(filter: &LeadFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.to_db_str().to_string()));
    }
    if let Some(min) = filter.min_score {
        clauses.push("score >= ?");
        values.push(Value::Integer(min as i64));
    }
    if let Some(max) = filter.max_score {
        clauses.push("score <= ?");
        values.push(Value::Integer(max as i64));
    }
    if let Some(industry) = filter.industry {
        clauses.push("industry = ?");
        values.push(Value::Text(industry.to_db_str().to_string()));
    }
    if let Some(seniority) = filter.seniority {
        clauses.push("seniority = ?");
        values.push(Value::Text(seniority.to_db_str().to_string()));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(
            "(email LIKE ? ESCAPE '\\' OR firstName LIKE ? ESCAPE '\\' \
             OR lastName LIKE ? ESCAPE '\\' OR company LIKE ? ESCAPE '\\')",
        );
        let pattern = like_pattern(term);
        for _ in 0..4 {
            values.push(Value::Text(pattern.clone()));
        }
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_clause, values)
}

// ==========================================
// LeadRepository - 线索仓储
// ==========================================
pub struct LeadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LeadRepository {
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

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn collect_leads(
        conn: &Connection,
        sql: &str,
        values: &[Value],
    ) -> RepositoryResult<Vec<Lead>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), LeadRow::from_row)?;

        let mut leads = Vec::new();
        for row in rows {
            leads.push(Lead::try_from(row?)?);
        }
        Ok(leads)
    }

    /// 过滤 + 分页查询
    ///
    /// # 排序
    /// - score 降序，同分按 createdAt 降序
    ///
    /// # 返回
    /// - (当前页线索, 满足条件的总数)
    pub fn query(
        &self,
        filter: &LeadFilter,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<(Vec<Lead>, u64)> {
        let (where_clause, mut values) = build_filter(filter);
        let conn = self.get_conn()?;

        let count_sql = format!("SELECT COUNT(*) FROM leads {}", where_clause);
        let total: i64 =
            conn.query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        let offset = (page.max(1) as i64 - 1) * limit as i64;
        let sql = format!(
            "SELECT {} FROM leads {} ORDER BY score DESC, createdAt DESC LIMIT ? OFFSET ?",
            LEAD_COLUMNS, where_clause
        );
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset));

        let leads = Self::collect_leads(&conn, &sql, &values)?;
        Ok((leads, total.max(0) as u64))
    }

    /// 按 id 查询
    pub fn find_by_id(&self, lead_id: &str) -> RepositoryResult<Option<Lead>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS);
        let row = conn
            .query_row(&sql, params![lead_id], LeadRow::from_row)
            .optional()?;
        row.map(Lead::try_from).transpose()
    }

    /// 更新单条线索状态
    pub fn update_status(&self, lead_id: &str, status: LeadStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE leads SET status = ?1 WHERE id = ?2",
            params![status.to_db_str(), lead_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Lead", lead_id));
        }
        Ok(())
    }

    /// 批量更新线索状态（事务化，未知 id 忽略）
    ///
    /// # 返回
    /// - 实际更新的条数
    pub fn bulk_update_status(
        &self,
        lead_ids: &[String],
        status: LeadStatus,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut updated = 0;
        {
            let mut stmt = tx.prepare("UPDATE leads SET status = ?1 WHERE id = ?2")?;
            for lead_id in lead_ids {
                updated += stmt.execute(params![status.to_db_str(), lead_id])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(updated)
    }

    /// 导出用列表（score 降序）
    ///
    /// # 参数
    /// - lead_ids: None 表示全部
    pub fn list_for_export(&self, lead_ids: Option<&[String]>) -> RepositoryResult<Vec<Lead>> {
        let conn = self.get_conn()?;
        match lead_ids {
            None => {
                let sql = format!(
                    "SELECT {} FROM leads ORDER BY score DESC, createdAt DESC",
                    LEAD_COLUMNS
                );
                Self::collect_leads(&conn, &sql, &[])
            }
            Some([]) => Ok(Vec::new()),
            Some(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    "SELECT {} FROM leads WHERE id IN ({}) ORDER BY score DESC, createdAt DESC",
                    LEAD_COLUMNS, placeholders
                );
                let values: Vec<Value> = ids.iter().map(|id| Value::Text(id.clone())).collect();
                Self::collect_leads(&conn, &sql, &values)
            }
        }
    }

    /// 驾驶舱统计
    pub fn stats(&self) -> RepositoryResult<LeadStats> {
        let conn = self.get_conn()?;

        let (total_leads, average_score): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(score) FROM leads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let total_imports: i64 =
            conn.query_row("SELECT COUNT(*) FROM imports", [], |row| row.get(0))?;

        let mut score_distribution = Vec::with_capacity(SCORE_BUCKETS.len());
        for (min, max) in SCORE_BUCKETS {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM leads WHERE score >= ?1 AND score <= ?2",
                params![min, max],
                |row| row.get(0),
            )?;
            score_distribution.push(ScoreBucket {
                min,
                max,
                count: count.max(0) as u64,
            });
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT industry, COUNT(*) AS n FROM leads
            GROUP BY industry
            ORDER BY n DESC, industry ASC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![TOP_INDUSTRY_LIMIT as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut top_industries = Vec::new();
        for row in rows {
            let (industry, count) = row?;
            let industry = industry
                .parse()
                .map_err(|message| RepositoryError::FieldValueError {
                    field: "industry".to_string(),
                    message,
                })?;
            top_industries.push(IndustryCount {
                industry,
                count: count.max(0) as u64,
            });
        }

        Ok(LeadStats {
            total_leads: total_leads.max(0) as u64,
            total_imports: total_imports.max(0) as u64,
            average_score: average_score.unwrap_or(0.0),
            score_distribution,
            top_industries,
        })
    }
}
