// ==========================================
// 撿貨資訊聯邦查詢引擎 - 引擎层错误类型
// ==========================================
// 说明: 单来源读取失败不在此列（随部分结果返回）
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// 输入校验失败（访问任何来源之前报告，不重试）
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
