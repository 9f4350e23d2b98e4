// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、CSV 夹具、可注入故障的仓储包装
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use lead_import::db::{init_schema, open_sqlite_connection};
use lead_import::domain::{CompanyPattern, Import, ImportPatch, Lead, ScoredLead};
use lead_import::repository::{
    LeadImportRepository, LeadImportRepositoryImpl, RepositoryError, RepositoryResult,
};
use rusqlite::Connection;
use std::error::Error;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接（各仓储共用）
pub fn shared_conn(db_path: &str) -> Arc<Mutex<Connection>> {
    let conn = open_sqlite_connection(db_path).expect("Failed to open db");
    Arc::new(Mutex::new(conn))
}

/// 写入带扩展名的临时文件
pub fn write_temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

pub fn write_csv(content: &str) -> NamedTempFile {
    write_temp_file(".csv", content)
}

const TITLES: [&str; 5] = ["CEO", "VP of Sales", "Marketing Manager", "Engineer", ""];
const COMPANIES: [&str; 4] = ["Acme Software", "Globex Bank", "Initech Hospital", ""];

/// 生成 unique 条互不重复的线索行，再追加 duplicate_of 中各行邮箱（大写）的重复行
///
/// 表头使用非规范写法，顺带覆盖列名归一化
pub fn leads_csv(unique: usize, duplicate_of: &[usize]) -> String {
    let mut csv = String::from("E-mail Address,First Name,Surname,Organization,Job Title,Phone Number,LinkedIn URL\n");
    for i in 0..unique {
        let phone = if i % 2 == 0 { format!("555-010{}", i % 10) } else { String::new() };
        let linkedin = if i % 3 == 0 {
            format!("https://linkedin.com/in/person{}", i)
        } else {
            String::new()
        };
        csv.push_str(&format!(
            "person{i}@example.com,First{i},Last{i},{},{},{},{}\n",
            COMPANIES[i % COMPANIES.len()],
            TITLES[i % TITLES.len()],
            phone,
            linkedin,
        ));
    }
    for &i in duplicate_of {
        csv.push_str(&format!(
            "PERSON{i}@EXAMPLE.COM,Other{i},Name{i},Elsewhere Ltd,,,\n"
        ));
    }
    csv
}

// ==========================================
// InstrumentedRepository - 可注入故障的仓储
// ==========================================
// - 记录所有 update_import 补丁（按写入顺序）
// - fail_on_create = Some(n): 第 n 次 create_lead 返回错误
pub struct InstrumentedRepository {
    inner: LeadImportRepositoryImpl,
    fail_on_create: Option<usize>,
    create_calls: AtomicUsize,
    patches: Mutex<Vec<ImportPatch>>,
}

impl InstrumentedRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, fail_on_create: Option<usize>) -> Self {
        Self {
            inner: LeadImportRepositoryImpl::from_connection(conn),
            fail_on_create,
            create_calls: AtomicUsize::new(0),
            patches: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_patches(&self) -> Vec<ImportPatch> {
        self.patches.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeadImportRepository for InstrumentedRepository {
    async fn create_import(&self, filename: &str) -> RepositoryResult<Import> {
        self.inner.create_import(filename).await
    }

    async fn get_import(&self, import_id: &str) -> RepositoryResult<Option<Import>> {
        self.inner.get_import(import_id).await
    }

    async fn update_import(&self, import_id: &str, patch: ImportPatch) -> RepositoryResult<Import> {
        let updated = self.inner.update_import(import_id, patch.clone()).await?;
        self.patches.lock().unwrap().push(patch);
        Ok(updated)
    }

    async fn create_lead(&self, lead: ScoredLead, import_id: &str) -> RepositoryResult<String> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_create == Some(call) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "injected failure on create #{}",
                call
            )));
        }
        self.inner.create_lead(lead, import_id).await
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Lead>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_name_and_company(
        &self,
        first_name: &str,
        last_name: &str,
        company: &CompanyPattern,
    ) -> RepositoryResult<Option<Lead>> {
        self.inner
            .find_by_name_and_company(first_name, last_name, company)
            .await
    }
}

/// 读取某批次的全部线索
pub fn leads_of_import(conn: &Arc<Mutex<Connection>>, import_id: &str) -> Vec<Lead> {
    let repo = lead_import::repository::LeadRepository::from_connection(conn.clone());
    repo.list_for_export(None)
        .expect("Failed to list leads")
        .into_iter()
        .filter(|lead| lead.import_id == import_id)
        .collect()
}
