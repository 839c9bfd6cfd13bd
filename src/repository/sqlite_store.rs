// ==========================================
// 撿貨資訊聯邦查詢引擎 - SQLite 文档仓储
// ==========================================
// 存储: documents 表 (collection + 带类型标签的 JSON body)
// 查询: 按集合顺序扫描，过滤条件在内存中求值；料號等值条件先走 item_key 索引
// 读取: 文件库使用独立读连接，写入独占共享连接
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::fields::{ITEM_ID, STORAGE_ID};
use crate::domain::{FieldValue, Record};
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::filter::{Filter, Projection};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// 存储编码
// ==========================================
// Int / Float / DateTime 需要无损往返，普通 JSON 无法区分
// DateTime 保留小数秒（Excel 序列日期精确到毫秒）
const STORED_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
enum StoredValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(Option<f64>),
    Text(String),
    DateTime(String),
}

impl From<&FieldValue> for StoredValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => StoredValue::Null,
            FieldValue::Bool(b) => StoredValue::Bool(*b),
            FieldValue::Int(i) => StoredValue::Int(*i),
            // JSON 无 NaN，NaN 以 None 落库
            FieldValue::Float(f) => StoredValue::Float(if f.is_finite() { Some(*f) } else { None }),
            FieldValue::Text(s) => StoredValue::Text(s.clone()),
            FieldValue::DateTime(dt) => {
                StoredValue::DateTime(dt.format(STORED_DATETIME_FORMAT).to_string())
            }
        }
    }
}

impl StoredValue {
    fn into_field_value(self) -> FieldValue {
        match self {
            StoredValue::Null => FieldValue::Null,
            StoredValue::Bool(b) => FieldValue::Bool(b),
            StoredValue::Int(i) => FieldValue::Int(i),
            StoredValue::Float(f) => FieldValue::Float(f.unwrap_or(f64::NAN)),
            StoredValue::Text(s) => FieldValue::Text(s),
            StoredValue::DateTime(s) => NaiveDateTime::parse_from_str(&s, STORED_DATETIME_FORMAT)
                .map(FieldValue::DateTime)
                .unwrap_or(FieldValue::Text(s)),
        }
    }
}

fn encode_record(collection: &str, record: &Record) -> RepositoryResult<String> {
    let pairs: Vec<(&String, StoredValue)> =
        record.iter().map(|(k, v)| (k, StoredValue::from(v))).collect();
    serde_json::to_string(&pairs).map_err(|e| RepositoryError::DocumentCodecError {
        collection: collection.to_string(),
        message: e.to_string(),
    })
}

/// 料號索引键；无料號时为空串（NULL 留给待回填的旧行）
fn item_key_of(record: &Record) -> String {
    record
        .get(ITEM_ID)
        .and_then(FieldValue::lookup_key)
        .unwrap_or_default()
}

/// 可走料號索引的条件: 顶层 `料號 = 值`
///
/// 外层 Some 表示可走索引；内层 None 表示值为空，必然无匹配
fn indexed_item_key(filter: &Filter) -> Option<Option<String>> {
    match filter {
        Filter::Eq(field, value) if field == ITEM_ID => Some(value.lookup_key()),
        _ => None,
    }
}

fn decode_record(collection: &str, body: &str) -> RepositoryResult<Record> {
    let pairs: Vec<(String, StoredValue)> =
        serde_json::from_str(body).map_err(|e| RepositoryError::DocumentCodecError {
            collection: collection.to_string(),
            message: e.to_string(),
        })?;
    Ok(pairs
        .into_iter()
        .map(|(k, v)| (k, v.into_field_value()))
        .collect())
}

/// 为旧行回填料號索引键
fn backfill_item_keys(conn: &Connection) -> RepositoryResult<usize> {
    let pending: Vec<(i64, String, String)> = {
        let mut stmt =
            conn.prepare("SELECT seq, collection, body FROM documents WHERE item_key IS NULL")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
    for (seq, collection, body) in &pending {
        let record = decode_record(collection, body)?;
        tx.execute(
            "UPDATE documents SET item_key = ?1 WHERE seq = ?2",
            params![item_key_of(&record), seq],
        )?;
    }
    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

    info!(rows = pending.len(), "料號索引键回填完成");
    Ok(pending.len())
}

// ==========================================
// SqliteDocumentStore
// ==========================================
/// SQLite 文档仓储
/// 职责: 管理 documents 表的读写
/// 红线: 不含业务逻辑，只负责数据访问
pub struct SqliteDocumentStore {
    /// 写入与内存库读取共用的连接
    conn: Arc<Mutex<Connection>>,
    /// 文件库路径；存在时读取走独立连接，不占用共享锁
    db_path: Option<String>,
    /// 空闲读连接
    readers: Mutex<Vec<Connection>>,
}

/// 保留的空闲读连接上限
const MAX_IDLE_READERS: usize = 8;

impl SqliteDocumentStore {
    /// 打开数据库文件并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        backfill_item_keys(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(db_path.to_string()),
            readers: Mutex::new(Vec::new()),
        })
    }

    /// 从已有连接创建仓储实例（会补齐表结构）
    ///
    /// 连接指向文件库时，读取同样改走独立连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let db_path = {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            ensure_schema(&guard)?;
            backfill_item_keys(&guard)?;
            guard
                .path()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_string())
        };
        Ok(Self {
            conn,
            db_path,
            readers: Mutex::new(Vec::new()),
        })
    }

    /// 共享底层连接（写入与配置管理器复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在读连接上执行查询
    ///
    /// 文件库: 取空闲读连接（没有则新开），用完放回；一个来源的慢读不会挡住其他来源
    /// 内存库: 只能使用共享连接
    fn with_reader<T>(
        &self,
        read: impl FnOnce(&Connection) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let Some(path) = &self.db_path else {
            let conn = self.get_conn()?;
            return read(&conn);
        };

        let idle = self
            .readers
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?
            .pop();
        let conn = match idle {
            Some(conn) => conn,
            None => open_sqlite_connection(path)
                .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?,
        };

        let result = read(&conn);
        if let Ok(mut readers) = self.readers.lock() {
            if readers.len() < MAX_IDLE_READERS {
                readers.push(conn);
            }
        }
        result
    }

    fn check_collection(collection: &str) -> RepositoryResult<()> {
        if collection.trim().is_empty() {
            return Err(RepositoryError::InvalidCollection(
                "集合名不能为空".to_string(),
            ));
        }
        Ok(())
    }

    /// 按写入顺序扫描集合，返回满足条件的记录
    ///
    /// `limit` 为 Some(n) 时最多返回 n 条；`料號 = 值` 条件先经 item_key 索引预筛
    fn scan(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<Record>> {
        Self::check_collection(collection)?;
        filter.validate().map_err(RepositoryError::InvalidFilter)?;

        let item_key = match indexed_item_key(filter) {
            Some(None) => return Ok(Vec::new()),
            Some(Some(key)) => Some(key),
            None => None,
        };

        let matched = self.with_reader(|conn| {
            let mut stmt = match item_key {
                Some(_) => conn.prepare(
                    "SELECT body FROM documents WHERE collection = ?1 AND item_key = ?2 ORDER BY seq",
                )?,
                None => {
                    conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq")?
                }
            };
            let mut rows = match &item_key {
                Some(key) => stmt.query(params![collection, key])?,
                None => stmt.query(params![collection])?,
            };

            let mut matched = Vec::new();
            while let Some(row) = rows.next()? {
                let body: String = row.get(0)?;
                let record = decode_record(collection, &body)?;
                // 索引只做预筛，最终以过滤条件为准
                if !filter.matches(&record) {
                    continue;
                }
                matched.push(match projection {
                    Some(p) => p.apply(record),
                    None => record,
                });
                if limit.map(|n| matched.len() >= n).unwrap_or(false) {
                    break;
                }
            }
            Ok(matched)
        })?;

        debug!(
            collection,
            indexed = item_key.is_some(),
            matched = matched.len(),
            "文档扫描完成"
        );
        Ok(matched)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> RepositoryResult<Vec<Record>> {
        self.scan(collection, filter, projection, None)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> RepositoryResult<Option<Record>> {
        Ok(self
            .scan(collection, filter, projection, Some(1))?
            .into_iter()
            .next())
    }

    fn insert_many(&self, collection: &str, records: Vec<Record>) -> RepositoryResult<usize> {
        Self::check_collection(collection)?;
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for mut record in records {
            let doc_id = match record.get(STORAGE_ID).and_then(FieldValue::as_text) {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    record.insert(STORAGE_ID, id.clone());
                    id
                }
            };
            let body = encode_record(collection, &record)?;
            tx.execute(
                "INSERT INTO documents (doc_id, collection, item_key, body) VALUES (?1, ?2, ?3, ?4)",
                params![doc_id, collection, item_key_of(&record), body],
            )?;
            count += 1;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(collection, inserted = count, "文档批量写入完成");
        Ok(count)
    }

    fn drop_collection(&self, collection: &str) -> RepositoryResult<usize> {
        Self::check_collection(collection)?;
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE collection = ?1",
            params![collection],
        )?;
        Ok(deleted)
    }

    fn list(&self, collection: &str, limit: usize) -> RepositoryResult<Vec<Record>> {
        let mut records = self.scan(collection, &Filter::All, None, Some(limit))?;
        for record in records.iter_mut() {
            record.remove(STORAGE_ID);
        }
        Ok(records)
    }
}
