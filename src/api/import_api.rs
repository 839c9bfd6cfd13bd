// ==========================================
// 撿貨資訊聯邦查詢引擎 - 数据导入API
// ==========================================
// 职责: 来源文件上传 / 匯入資料列表 / 匯入資料清空
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::ApiEnvelope;
use crate::config::FederationConfig;
use crate::domain::{Record, SourceKind};
use crate::importer::{Ingestor, SourceImporter};
use crate::repository::DocumentStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 上传响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub source: SourceKind,
    pub inserted: usize,
}

/// 列表响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemListResponse {
    pub count: usize,
    pub items: Vec<Record>,
}

/// 清空响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub deleted: usize,
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    ingestor: Ingestor,
    store: Arc<dyn DocumentStore>,
    config: Arc<FederationConfig>,
}

impl ImportApi {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<FederationConfig>) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// 上传文件到指定来源
    pub async fn upload(
        &self,
        source: SourceKind,
        file_path: impl Into<PathBuf>,
    ) -> ApiEnvelope<UploadResponse> {
        let result: ApiResult<UploadResponse> = async {
            let summary = self.ingestor.import_file(source, file_path.into()).await?;
            Ok::<_, ApiError>(UploadResponse {
                source: summary.source,
                inserted: summary.inserted,
            })
        }
        .await;
        result.into()
    }

    /// 列出匯入資料（不含存储主键）
    pub fn list_items(&self, limit: Option<usize>) -> ApiEnvelope<ItemListResponse> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.config.list_limit);
        let collection = self.config.collection(SourceKind::StockMovementLog);
        let result: ApiResult<ItemListResponse> = self
            .store
            .list(collection, limit)
            .map(|items| ItemListResponse {
                count: items.len(),
                items,
            })
            .map_err(ApiError::from);
        result.into()
    }

    /// 清空匯入資料（必须显式确认）
    pub fn clear(&self, confirm: bool) -> ApiEnvelope<ClearResponse> {
        let result: ApiResult<ClearResponse> = if !confirm {
            Err(ApiError::MissingConfirmation)
        } else {
            let collection = self.config.collection(SourceKind::StockMovementLog);
            self.store
                .drop_collection(collection)
                .map(|deleted| {
                    info!(collection = %collection, deleted, "匯入資料已清空");
                    ClearResponse { deleted }
                })
                .map_err(ApiError::from)
        };
        result.into()
    }
}
