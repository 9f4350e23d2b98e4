// ==========================================
// 线索导入系统 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新（global scope）
// ==========================================

use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager};

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    /// 创建新的ConfigApi实例
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 查询所有已知配置的生效值（未设置时为默认值）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let entries = self.config_manager.effective_config()?;
        Ok(entries
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    /// 查询单个配置的生效值
    ///
    /// # 返回
    /// - Err(InvalidInput): 未知配置键
    pub fn get_config(&self, key: &str) -> ApiResult<ConfigItem> {
        let key = key.trim();
        if !config_keys::ALL.contains(&key) {
            return Err(ApiError::InvalidInput(format!("未知配置键: {}", key)));
        }

        self.list_configs()?
            .into_iter()
            .find(|item| item.key == key)
            .ok_or_else(|| ApiError::InternalError(format!("配置键缺少默认值: {}", key)))
    }

    /// 更新配置（写入前校验）
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<ConfigItem> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }

        self.config_manager.set_global_config_value(key, value)?;
        self.get_config(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn api() -> ConfigApi {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigApi::new(Arc::new(ConfigManager::from_connection(Arc::new(Mutex::new(conn)))))
    }

    #[test]
    fn test_update_and_read_config() {
        let api = api();
        let item = api
            .update_config(config_keys::RECENT_LIMIT, " 5 ")
            .unwrap();
        assert_eq!(item.value, "5");
        assert_eq!(api.list_configs().unwrap().len(), config_keys::ALL.len());
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_value() {
        let api = api();
        assert!(matches!(
            api.get_config("no.such.key"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.update_config(config_keys::CHECKPOINT_INTERVAL, "-1"),
            Err(ApiError::ConfigError(_))
        ));
    }
}
