// ==========================================
// 撿貨資訊聯邦查詢引擎 - API 层
// ==========================================
// 职责: 请求/响应边界，所有结果以信封返回
// ==========================================

pub mod error;
pub mod import_api;
pub mod pick_api;
pub mod response;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ClearResponse, ImportApi, ItemListResponse, UploadResponse};
pub use pick_api::{PickApi, PickRequest, PickResponse};
pub use response::ApiEnvelope;
