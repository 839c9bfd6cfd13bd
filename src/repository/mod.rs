// ==========================================
// 撿貨資訊聯邦查詢引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供文档读写接口,屏蔽数据库细节
// 约束: 所有 SQL 使用参数化
// ==========================================

pub mod document_store;
pub mod error;
pub mod filter;
pub mod sqlite_store;

// 重导出核心仓储
pub use document_store::DocumentStore;
pub use error::{RepositoryError, RepositoryResult};
pub use filter::{Filter, Projection};
pub use sqlite_store::SqliteDocumentStore;
