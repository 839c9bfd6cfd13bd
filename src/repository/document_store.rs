// ==========================================
// 撿貨資訊聯邦查詢引擎 - 文档仓储接口
// ==========================================
// 职责: 以集合 + 过滤条件读取松散类型记录，批量写入
// 红线: 仓储不含业务逻辑
// ==========================================

use crate::domain::Record;
use crate::repository::error::RepositoryResult;
use crate::repository::filter::{Filter, Projection};

/// 文档仓储接口
///
/// 实现者: SqliteDocumentStore
pub trait DocumentStore: Send + Sync {
    /// 查询集合中满足条件的全部记录（按写入顺序）
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> RepositoryResult<Vec<Record>>;

    /// 查询集合中第一条满足条件的记录
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> RepositoryResult<Option<Record>>;

    /// 批量写入，返回写入条数（为每条记录分配 `_id`）
    fn insert_many(&self, collection: &str, records: Vec<Record>) -> RepositoryResult<usize>;

    /// 删除整个集合，返回删除条数
    fn drop_collection(&self, collection: &str) -> RepositoryResult<usize>;

    /// 列出集合前 `limit` 条记录（不含存储主键）
    fn list(&self, collection: &str, limit: usize) -> RepositoryResult<Vec<Record>>;
}
