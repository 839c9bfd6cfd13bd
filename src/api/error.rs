// ==========================================
// 撿貨資訊聯邦查詢引擎 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，转换为失败信封中的错误文本与错误码
// ==========================================

use crate::engine::EngineError;
use crate::importer::ImportError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("Missing confirmation")]
    MissingConfirmation,

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("{0}")]
    EmptyFile(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::MissingConfirmation => "MISSING_CONFIRMATION",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::EmptyFile(_) => "EMPTY_FILE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            err @ RepositoryError::DocumentCodecError { .. } => {
                ApiError::DatabaseError(err.to_string())
            }
            RepositoryError::InvalidFilter(msg) | RepositoryError::InvalidCollection(msg) => {
                ApiError::InvalidInput(msg)
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Repository(err) => err.into(),
            EngineError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::EmptyFile => ApiError::EmptyFile(ImportError::EmptyFile.to_string()),
            ImportError::Repository(err) => err.into(),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
