// ==========================================
// 撿貨資訊聯邦查詢引擎 - 撿貨資訊查询API
// ==========================================
// 职责: 请求参数 → PickQuery → 信封化的 PickResponse
// 任何引擎错误都转换为失败信封，不向调用方抛出
// ==========================================

use crate::api::error::ApiResult;
use crate::api::response::ApiEnvelope;
use crate::domain::{Record, SortOrder};
use crate::engine::{PickQuery, PickResult, PickSearchEngine, SourceFailure};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 查询请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickRequest {
    #[serde(default, alias = "MIC需求起日")]
    pub start: Option<String>,
    #[serde(default, alias = "MIC需求訖日")]
    pub end: Option<String>,
    #[serde(default)]
    pub sort_field: Option<String>,
    /// asc / desc，其他取值按 asc 处理
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl PickRequest {
    fn to_query(&self) -> PickQuery {
        PickQuery {
            start: self.start.clone().unwrap_or_default(),
            end: self.end.clone(),
            sort_field: self
                .sort_field
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            sort_order: SortOrder::parse_lenient(self.sort_order.as_deref()),
        }
    }
}

/// 查询响应
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PickResponse {
    pub pick: Vec<Record>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_errors: Vec<SourceFailure>,
}

impl From<PickResult> for PickResponse {
    fn from(result: PickResult) -> Self {
        Self {
            pick: result.pick,
            source_errors: result.source_errors,
        }
    }
}

// ==========================================
// PickApi
// ==========================================
pub struct PickApi {
    engine: Arc<PickSearchEngine>,
}

impl PickApi {
    pub fn new(engine: Arc<PickSearchEngine>) -> Self {
        Self { engine }
    }

    pub async fn search(&self, request: &PickRequest) -> ApiResult<PickResponse> {
        let result = self.engine.search(&request.to_query()).await?;
        Ok(result.into())
    }

    /// 查询并包装为响应信封
    pub async fn search_pick(&self, request: &PickRequest) -> ApiEnvelope<PickResponse> {
        self.search(request).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_accepts_field_name_aliases() {
        let request: PickRequest = serde_json::from_value(json!({
            "MIC需求起日": "2024-01-01",
            "sort_field": " ",
            "sort_order": "DESC"
        }))
        .unwrap();
        let query = request.to_query();

        assert_eq!(query.start, "2024-01-01");
        assert_eq!(query.end, None);
        assert_eq!(query.sort_field, None);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_response_omits_empty_source_errors() {
        let response = PickResponse {
            pick: vec![Record::new().with("料號", "A1")],
            source_errors: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "pick": [{ "料號": "A1" }] })
        );
    }
}
