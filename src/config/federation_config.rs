// ==========================================
// 撿貨資訊聯邦查詢引擎 - 运行配置
// ==========================================
// 加载顺序: 默认值 → 环境变量 → config_kv 覆写 (ConfigManager)
// 进程级对象，启动时构建后显式传入各组件
// ==========================================

use crate::domain::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 单来源读取超时默认值（毫秒）
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 5_000;

/// 列表接口默认条数上限
pub const DEFAULT_LIST_LIMIT: usize = 1_000;

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "pick_federation.db";

// ==========================================
// 环境变量名
// ==========================================
pub mod env_keys {
    pub const DB_PATH: &str = "DB_PATH";
    pub const PURCHASE_SHIPPING_COLLECTION_NAME: &str = "PURCHASE_SHIPPING_COLLECTION_NAME";
    pub const INVENTORY_NEED_COLLECTION_NAME: &str = "INVENTORY_NEED_COLLECTION_NAME";
    pub const CUSTOMER_NEED_COLLECTION_NAME: &str = "CUSTOMER_NEED_COLLECTION_NAME";
    pub const PRODUCTS_COLLECTION_NAME: &str = "PRODUCTS_COLLECTION_NAME";
    pub const COLLECTION_NAME: &str = "COLLECTION_NAME";
    pub const SOURCE_TIMEOUT_MS: &str = "SOURCE_TIMEOUT_MS";
    pub const LIST_LIMIT: &str = "LIST_LIMIT";
}

/// 来源对应的集合名环境变量
fn collection_env_key(source: SourceKind) -> &'static str {
    match source {
        SourceKind::PurchaseShipping => env_keys::PURCHASE_SHIPPING_COLLECTION_NAME,
        SourceKind::InventoryNeed => env_keys::INVENTORY_NEED_COLLECTION_NAME,
        SourceKind::CustomerNeed => env_keys::CUSTOMER_NEED_COLLECTION_NAME,
        SourceKind::ProductMaster => env_keys::PRODUCTS_COLLECTION_NAME,
        SourceKind::StockMovementLog => env_keys::COLLECTION_NAME,
    }
}

// ==========================================
// FederationConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// 数据库文件路径
    pub db_path: String,
    /// 来源 → 集合名
    pub collections: HashMap<SourceKind, String>,
    /// 单来源读取超时（毫秒）
    pub source_timeout_ms: u64,
    /// 列表接口条数上限
    pub list_limit: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_FILE.to_string(),
            collections: SourceKind::ALL
                .iter()
                .map(|s| (*s, s.default_collection().to_string()))
                .collect(),
            source_timeout_ms: DEFAULT_SOURCE_TIMEOUT_MS,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl FederationConfig {
    /// 从进程环境变量加载
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（空值视为未设置，非法数值回落默认值）
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(path) = get(env_keys::DB_PATH) {
            config.db_path = path;
        }
        for source in SourceKind::ALL {
            if let Some(name) = get(collection_env_key(source)) {
                config.collections.insert(source, name);
            }
        }
        if let Some(ms) = get(env_keys::SOURCE_TIMEOUT_MS) {
            match ms.parse::<u64>() {
                Ok(v) if v > 0 => config.source_timeout_ms = v,
                _ => tracing::warn!(value = %ms, "SOURCE_TIMEOUT_MS 非法，使用默认值"),
            }
        }
        if let Some(limit) = get(env_keys::LIST_LIMIT) {
            match limit.parse::<usize>() {
                Ok(v) if v > 0 => config.list_limit = v,
                _ => tracing::warn!(value = %limit, "LIST_LIMIT 非法，使用默认值"),
            }
        }
        config
    }

    /// 来源对应的集合名
    pub fn collection(&self, source: SourceKind) -> &str {
        self.collections
            .get(&source)
            .map(String::as_str)
            .unwrap_or_else(|| source.default_collection())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}
