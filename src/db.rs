// ==========================================
// 撿貨資訊聯邦查詢引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发读写时的偶发 busy 错误
// - 幂等建表（documents / config_kv），旧库补列
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：busy_timeout 需要“每个连接”单独配置
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

/// 建表（幂等）
///
/// - documents: 各来源集合的文档，body 为带类型标签的 JSON
/// - config_kv: 运行配置覆写
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_id TEXT NOT NULL UNIQUE,
            collection TEXT NOT NULL,
            item_key TEXT,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    ensure_item_key_column(conn)?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_documents_item_key ON documents(collection, item_key, seq);",
    )
}

/// 旧库补 item_key 列（料號等值索引键）
///
/// 保持可空: NULL 表示尚未计算，由仓储打开时回填
fn ensure_item_key_column(conn: &Connection) -> rusqlite::Result<()> {
    let has_col: i32 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('documents') WHERE name = 'item_key'",
        [],
        |row| row.get(0),
    )?;
    if has_col > 0 {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE documents ADD COLUMN item_key TEXT;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('documents', 'config_kv')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_item_key_column_added_to_old_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            INSERT INTO documents (doc_id, collection, body) VALUES ('d1', 'items', '[]');
            "#,
        )
        .unwrap();

        ensure_schema(&conn).unwrap();

        let item_key: Option<String> = conn
            .query_row("SELECT item_key FROM documents WHERE doc_id = 'd1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(item_key, None);
    }
}
