// ==========================================
// 线索导入系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ConfigApi, DashboardApi, ImportApi, LeadApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::LeadImporterImpl;
use crate::repository::{ImportRepository, LeadImportRepositoryImpl, LeadRepository};

/// 应用状态
///
/// 所有仓储共享同一个连接（导入管道读己之写）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 线索API
    pub lead_api: Arc<LeadApi>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let pipeline_repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn.clone()));
        let import_repo = Arc::new(ImportRepository::from_connection(conn.clone()));
        let lead_repo = Arc::new(LeadRepository::from_connection(conn.clone()));

        // ==========================================
        // 配置与导入协调器
        // ==========================================
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let importer = Arc::new(LeadImporterImpl::new(
            pipeline_repo,
            ConfigManager::from_connection(conn),
        ));

        // ==========================================
        // 创建API实例
        // ==========================================
        let import_api = Arc::new(ImportApi::new(
            importer,
            import_repo,
            config_manager.clone(),
        ));
        let lead_api = Arc::new(LeadApi::new(lead_repo.clone(), config_manager.clone()));
        let dashboard_api = Arc::new(DashboardApi::new(lead_repo));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            import_api,
            lead_api,
            dashboard_api,
            config_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 LEAD_IMPORT_DB_PATH
/// 2. 用户数据目录下 lead-import/lead_import.db
/// 3. 当前目录 ./lead_import.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LEAD_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./lead_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("lead-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("lead_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
