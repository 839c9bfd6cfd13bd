// ==========================================
// 撿貨資訊聯邦查詢引擎 - 配置管理器
// ==========================================
// 职责: config_kv 表读写，将覆写项叠加到 FederationConfig
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::federation_config::FederationConfig;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::SourceKind;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

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
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 将 config_kv 中的覆写项叠加到配置上
    ///
    /// 非法数值记录告警后忽略，不阻断启动
    pub fn apply_overrides(&self, mut config: FederationConfig) -> Result<FederationConfig, Box<dyn Error>> {
        for source in SourceKind::ALL {
            let key = config_keys::collection(source);
            if let Some(name) = self.get_config_value(&key)? {
                let name = name.trim();
                if !name.is_empty() {
                    config.collections.insert(source, name.to_string());
                }
            }
        }

        if let Some(raw) = self.get_config_value(config_keys::SOURCE_TIMEOUT_MS)? {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.source_timeout_ms = ms,
                _ => tracing::warn!(key = config_keys::SOURCE_TIMEOUT_MS, value = %raw, "配置值非法，忽略"),
            }
        }

        if let Some(raw) = self.get_config_value(config_keys::LIST_LIMIT)? {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.list_limit = limit,
                _ => tracing::warn!(key = config_keys::LIST_LIMIT, value = %raw, "配置值非法，忽略"),
            }
        }

        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::SourceKind;

    // 读取超时
    pub const SOURCE_TIMEOUT_MS: &str = "fanout/source_timeout_ms";

    // 列表上限
    pub const LIST_LIMIT: &str = "list/limit";

    /// 集合名覆写: collection/{source}
    pub fn collection(source: SourceKind) -> String {
        format!("collection/{}", source.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let manager = memory_manager();
        assert!(manager.get_config_value("nope").unwrap().is_none());
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let manager = memory_manager();
        manager
            .set_config_value(&config_keys::collection(SourceKind::InventoryNeed), "inv_v2")
            .unwrap();
        manager.set_config_value(config_keys::SOURCE_TIMEOUT_MS, "250").unwrap();
        manager.set_config_value(config_keys::LIST_LIMIT, "-3").unwrap();

        let config = manager.apply_overrides(FederationConfig::default()).unwrap();
        assert_eq!(config.collection(SourceKind::InventoryNeed), "inv_v2");
        assert_eq!(config.source_timeout_ms, 250);
        assert_eq!(config.list_limit, FederationConfig::default().list_limit);
    }

    #[test]
    fn test_set_is_upsert() {
        let manager = memory_manager();
        manager.set_config_value("k", "1").unwrap();
        manager.set_config_value("k", "2").unwrap();
        assert_eq!(manager.get_config_value("k").unwrap(), Some("2".to_string()));
    }
}
