// ==========================================
// 撿貨資訊聯邦查詢引擎 - 响应信封
// ==========================================
// 成功: { "ok": true, "data": ... }
// 失败: { "ok": false, "error": "..." }
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiEnvelope<T> {
    Success(T),
    Failure { code: &'static str, error: String },
}

impl<T> ApiEnvelope<T> {
    pub fn failure(err: &ApiError) -> Self {
        ApiEnvelope::Failure {
            code: err.code(),
            error: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ApiEnvelope::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiEnvelope::Success(data) => Some(data),
            ApiEnvelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiEnvelope::Success(_) => None,
            ApiEnvelope::Failure { error, .. } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiEnvelope::Success(data) => Some(data),
            ApiEnvelope::Failure { .. } => None,
        }
    }
}

impl<T> From<ApiResult<T>> for ApiEnvelope<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ApiEnvelope::Success(data),
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "请求失败");
                ApiEnvelope::failure(&err)
            }
        }
    }
}

impl<T: Serialize> Serialize for ApiEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiEnvelope", 2)?;
        match self {
            ApiEnvelope::Success(data) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
            }
            ApiEnvelope::Failure { error, .. } => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
