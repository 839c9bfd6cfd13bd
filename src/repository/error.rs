// ==========================================
// 撿貨資訊聯邦查詢引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 文档错误 =====
    #[error("文档序列化失败 (collection={collection}): {message}")]
    DocumentCodecError { collection: String, message: String },

    #[error("无效的过滤条件: {0}")]
    InvalidFilter(String),

    #[error("无效的集合名: {0}")]
    InvalidCollection(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => RepositoryError::DatabaseQueryError(msg),
            rusqlite::Error::InvalidPath(path) => {
                RepositoryError::DatabaseConnectionError(path.display().to_string())
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::DocumentCodecError {
            collection: "unknown".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
