// ==========================================
// 线索导入系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发导入时的偶发 busy 错误
// - 幂等建表（imports / leads / config_kv）
// ==========================================
// 列名即交换格式字段名（firstName / importId / totalRecords ...），不可改动
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id   TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key  TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key),
    FOREIGN KEY (scope_id) REFERENCES config_scope(scope_id)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS imports (
    id               TEXT PRIMARY KEY,
    filename         TEXT NOT NULL,
    status           TEXT NOT NULL
                     CHECK (status IN ('queued', 'processing', 'completed', 'failed')),
    totalRecords     INTEGER NOT NULL DEFAULT 0,
    processedRecords INTEGER NOT NULL DEFAULT 0,
    duplicatesFound  INTEGER NOT NULL DEFAULT 0,
    errorMessage     TEXT,
    createdAt        TEXT NOT NULL,
    completedAt      TEXT
);

CREATE INDEX IF NOT EXISTS idx_imports_created ON imports(createdAt DESC);

-- importId 不设外键：删除导入记录不影响已创建的线索
CREATE TABLE IF NOT EXISTS leads (
    id             TEXT PRIMARY KEY,
    email          TEXT,
    firstName      TEXT,
    lastName       TEXT,
    company        TEXT,
    title          TEXT,
    phone          TEXT,
    linkedin       TEXT,
    status         TEXT NOT NULL DEFAULT 'new'
                   CHECK (status IN ('new', 'contacted', 'qualified', 'converted')),
    industry       TEXT NOT NULL,
    seniority      TEXT NOT NULL,
    emailValid     INTEGER NOT NULL DEFAULT 0,
    score          INTEGER NOT NULL DEFAULT 0,
    scoreBreakdown TEXT NOT NULL,
    nextBestAction TEXT NOT NULL,
    importId       TEXT NOT NULL,
    rawData        TEXT NOT NULL,
    createdAt      TEXT NOT NULL,
    -- 去重比较键（Unicode 小写），不属于交换格式
    emailKey       TEXT,
    firstNameKey   TEXT,
    lastNameKey    TEXT
);

CREATE INDEX IF NOT EXISTS idx_leads_email_key ON leads(emailKey);
CREATE INDEX IF NOT EXISTS idx_leads_name_key ON leads(firstNameKey, lastNameKey);
CREATE INDEX IF NOT EXISTS idx_leads_import ON leads(importId);
CREATE INDEX IF NOT EXISTS idx_leads_score ON leads(score DESC);
"#;

/// 幂等建表并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
