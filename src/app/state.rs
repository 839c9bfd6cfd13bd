// ==========================================
// 撿貨資訊聯邦查詢引擎 - 应用状态
// ==========================================
// 职责: 进程级共享状态（仓储、配置、API实例）
// 启动时构建一次，显式传入每次调用，不使用全局变量
// ==========================================

use std::sync::Arc;

use crate::api::{ImportApi, PickApi};
use crate::config::{ConfigManager, FederationConfig};
use crate::engine::PickSearchEngine;
use crate::repository::{DocumentStore, SqliteDocumentStore};

/// 应用状态
pub struct AppState {
    /// 生效配置（已合并 config_kv 覆写）
    pub config: Arc<FederationConfig>,

    /// 文档仓储
    pub store: Arc<dyn DocumentStore>,

    /// 配置管理器（config_kv）
    pub config_manager: Arc<ConfigManager>,

    /// 撿貨資訊查询API
    pub pick_api: Arc<PickApi>,

    /// 数据导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 1. 打开数据库并建表
    /// 2. 合并 config_kv 覆写
    /// 3. 创建引擎与API实例
    pub fn new(config: FederationConfig) -> Result<Self, String> {
        tracing::info!(db_path = %config.db_path, "初始化AppState");

        let sqlite = SqliteDocumentStore::new(&config.db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let config_manager = ConfigManager::from_connection(sqlite.connection())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;

        let config = match config_manager.apply_overrides(config.clone()) {
            Ok(merged) => merged,
            Err(e) => {
                tracing::warn!(error = %e, "config_kv 覆写读取失败，使用环境配置");
                config
            }
        };
        let config = Arc::new(config);
        let store: Arc<dyn DocumentStore> = Arc::new(sqlite);

        let engine = Arc::new(PickSearchEngine::new(store.clone(), config.clone()));
        let pick_api = Arc::new(PickApi::new(engine));
        let import_api = Arc::new(ImportApi::new(store.clone(), config.clone()));

        tracing::info!(
            timeout_ms = config.source_timeout_ms,
            list_limit = config.list_limit,
            "AppState初始化完成"
        );

        Ok(Self {
            config,
            store,
            config_manager: Arc::new(config_manager),
            pick_api,
            import_api,
        })
    }

    /// 使用环境变量配置创建（未设置 DB_PATH 时使用默认数据目录）
    pub fn from_env() -> Result<Self, String> {
        let mut config = FederationConfig::from_env();
        if std::env::var(crate::config::env_keys::DB_PATH)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true)
        {
            config.db_path = get_default_db_path();
        }
        Self::new(config)
    }
}

/// 获取默认数据库路径
///
/// 优先使用用户数据目录，无法获取时回落到当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    let mut path = PathBuf::from(format!("./{}", crate::config::DEFAULT_DB_FILE));

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("pick-federation");
        // 目录创建失败时回落到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(crate::config::DEFAULT_DB_FILE);
        }
    }

    path.to_string_lossy().to_string()
}
