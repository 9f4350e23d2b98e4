// ==========================================
// 线索导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope，当前仅 global)
// 缺省: 键不存在时使用内置默认值；值非法时报 ConfigValueError
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RowLengthPolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const CHECKPOINT_INTERVAL: &str = "import.checkpoint_interval";
    pub const ROW_LENGTH_POLICY: &str = "import.row_length_policy";
    pub const RECENT_LIMIT: &str = "import.recent_limit";

    // 线索查询
    pub const DEFAULT_PAGE_SIZE: &str = "lead.default_page_size";

    /// 全部已知键
    pub const ALL: [&str; 4] = [
        CHECKPOINT_INTERVAL,
        ROW_LENGTH_POLICY,
        RECENT_LIMIT,
        DEFAULT_PAGE_SIZE,
    ];
}

// 默认值
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 10;
pub const DEFAULT_RECENT_LIMIT: u32 = 20;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

fn value_error(key: &str, value: &str, message: impl Into<String>) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}

fn parse_positive(key: &str, value: &str) -> ImportResult<u64> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|e| value_error(key, value, e.to_string()))?;
    if parsed == 0 {
        return Err(value_error(key, value, "必须 ≥ 1"));
    }
    Ok(parsed)
}

/// 校验配置值（写入前调用）
pub fn validate_config_value(key: &str, value: &str) -> ImportResult<()> {
    match key {
        config_keys::CHECKPOINT_INTERVAL
        | config_keys::RECENT_LIMIT
        | config_keys::DEFAULT_PAGE_SIZE => parse_positive(key, value).map(|_| ()),
        config_keys::ROW_LENGTH_POLICY => value
            .parse::<RowLengthPolicy>()
            .map(|_| ())
            .map_err(|msg| value_error(key, value, msg)),
        _ => Err(value_error(key, value, "未知配置键")),
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（需已建表）
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(|e| ImportError::ConfigReadError {
            key: "*".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self, key: &str) -> ImportResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: format!("锁获取失败: {}", e),
        })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.lock(key)?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 的配置值（校验后 UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        validate_config_value(key, value)?;

        let conn = self.lock(key)?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value.trim()],
        )
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        info!(config_key = key, value = value.trim(), "配置已更新");
        Ok(())
    }

    /// 全部已知键的当前生效值（未设置的键返回默认值）
    pub fn effective_config(&self) -> ImportResult<Vec<(String, String)>> {
        let mut entries = Vec::with_capacity(config_keys::ALL.len());
        for key in config_keys::ALL {
            let value = match self.get_global_config_value(key)? {
                Some(v) => v,
                None => default_value(key),
            };
            entries.push((key.to_string(), value));
        }
        Ok(entries)
    }

    fn get_config_or_default(&self, key: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default_value(key)))
    }

    /// 最近导入列表条数
    pub fn get_recent_import_limit(&self) -> ImportResult<u32> {
        let key = config_keys::RECENT_LIMIT;
        let value = self.get_config_or_default(key)?;
        Ok(parse_positive(key, &value)?.min(u32::MAX as u64) as u32)
    }

    /// 线索列表默认分页大小（截断到 1..=500）
    pub fn get_default_page_size(&self) -> ImportResult<u32> {
        let key = config_keys::DEFAULT_PAGE_SIZE;
        let value = self.get_config_or_default(key)?;
        Ok(parse_positive(key, &value)?.min(MAX_PAGE_SIZE as u64) as u32)
    }
}

fn default_value(key: &str) -> String {
    match key {
        config_keys::CHECKPOINT_INTERVAL => DEFAULT_CHECKPOINT_INTERVAL.to_string(),
        config_keys::ROW_LENGTH_POLICY => RowLengthPolicy::default().to_string(),
        config_keys::RECENT_LIMIT => DEFAULT_RECENT_LIMIT.to_string(),
        config_keys::DEFAULT_PAGE_SIZE => DEFAULT_PAGE_SIZE.to_string(),
        _ => String::new(),
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_checkpoint_interval(&self) -> ImportResult<u64> {
        let key = config_keys::CHECKPOINT_INTERVAL;
        let value = self.get_config_or_default(key)?;
        parse_positive(key, &value)
    }

    async fn get_row_length_policy(&self) -> ImportResult<RowLengthPolicy> {
        let key = config_keys::ROW_LENGTH_POLICY;
        let value = self.get_config_or_default(key)?;
        value
            .parse::<RowLengthPolicy>()
            .map_err(|msg| value_error(key, &value, msg))
    }
}

// ==========================================
// ImportSettings - 固定配置（不读库）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub checkpoint_interval: u64,
    pub row_length_policy: RowLengthPolicy,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            row_length_policy: RowLengthPolicy::default(),
        }
    }
}

#[async_trait]
impl ImportConfigReader for ImportSettings {
    async fn get_checkpoint_interval(&self) -> ImportResult<u64> {
        if self.checkpoint_interval == 0 {
            return Err(value_error(config_keys::CHECKPOINT_INTERVAL, "0", "必须 ≥ 1"));
        }
        Ok(self.checkpoint_interval)
    }

    async fn get_row_length_policy(&self) -> ImportResult<RowLengthPolicy> {
        Ok(self.row_length_policy)
    }
}
