// ==========================================
// 撿貨資訊聯邦查詢引擎 - 配置层
// ==========================================
// 职责: 运行配置加载（默认值 / 环境变量 / config_kv 覆写）
// ==========================================

pub mod config_manager;
pub mod federation_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use federation_config::{
    env_keys, FederationConfig, DEFAULT_DB_FILE, DEFAULT_LIST_LIMIT, DEFAULT_SOURCE_TIMEOUT_MS,
};
