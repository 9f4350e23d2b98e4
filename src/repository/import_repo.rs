// ==========================================
// 线索导入系统 - 导入批次仓储（管理视图）
// ==========================================
// 职责: 最近导入列表、批次删除、计数
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::Import;
use crate::domain::types::ImportStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::lead_import_repo_impl::{select_import, ImportRow, IMPORT_COLUMNS};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ImportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRepository {
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

    pub fn find_by_id(&self, import_id: &str) -> RepositoryResult<Option<Import>> {
        let conn = self.get_conn()?;
        select_import(&conn, import_id)
    }

    /// 最近导入（createdAt 降序）
    pub fn list_recent(&self, limit: u32) -> RepositoryResult<Vec<Import>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM imports ORDER BY createdAt DESC, rowid DESC LIMIT ?1",
            IMPORT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], ImportRow::from_row)?;

        let mut imports = Vec::new();
        for row in rows {
            imports.push(Import::try_from(row?)?);
        }
        Ok(imports)
    }

    /// 删除导入批次（已创建的线索保留）
    ///
    /// # 返回
    /// - Err(NotFound): 批次不存在
    /// - Err(InvalidStateTransition): 批次仍在 processing
    pub fn delete(&self, import_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let current = select_import(&conn, import_id)?
            .ok_or_else(|| RepositoryError::not_found("Import", import_id))?;

        if current.status == ImportStatus::Processing {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: "deleted".to_string(),
            });
        }

        conn.execute("DELETE FROM imports WHERE id = ?1", params![import_id])?;
        Ok(())
    }

    pub fn count(&self) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM imports", [], |row| row.get(0))?;
        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::import::ImportRun;
    use crate::repository::lead_import_repo::LeadImportRepository;
    use crate::repository::lead_import_repo_impl::LeadImportRepositoryImpl;

    fn shared_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_and_limited() {
        let conn = shared_conn();
        let pipeline = LeadImportRepositoryImpl::from_connection(conn.clone());
        let repo = ImportRepository::from_connection(conn);

        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(pipeline.create_import(&format!("f{}.csv", i)).await.unwrap().id);
        }

        let recent = repo.list_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_refuses_processing_import() {
        let conn = shared_conn();
        let pipeline = LeadImportRepositoryImpl::from_connection(conn.clone());
        let repo = ImportRepository::from_connection(conn);

        let import = pipeline.create_import("busy.csv").await.unwrap();
        let mut run = ImportRun::new(import.id.clone());
        pipeline
            .update_import(&import.id, run.begin().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            repo.delete(&import.id),
            Err(RepositoryError::InvalidStateTransition { .. })
        ));

        pipeline
            .update_import(&import.id, run.complete().unwrap())
            .await
            .unwrap();
        repo.delete(&import.id).unwrap();
        assert!(repo.find_by_id(&import.id).unwrap().is_none());
        assert!(matches!(
            repo.delete(&import.id),
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
