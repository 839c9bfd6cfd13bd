// ==========================================
// 撿貨資訊聯邦查詢引擎 - 领域模型层
// ==========================================
// 职责: 松散类型记录、数据来源、领域字段名
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod fields;
pub mod record;
pub mod types;

// 重导出核心类型
pub use record::{FieldValue, Record, DATETIME_TEXT_FORMAT, DATE_TEXT_FORMAT};
pub use types::{SortOrder, SourceKind};
