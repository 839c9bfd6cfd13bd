// ==========================================
// 撿貨資訊聯邦查詢引擎 - 核心库
// ==========================================
// 数据来源: 採購與出貨表 / 庫存與採購需求表 / 客戶需求表 / 產品資料
// 技术栈: Rust + SQLite + tokio
// 系统定位: 按 MIC 需求日期区间联合查询撿貨資訊，按料號补全品名/单价/库存
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与来源
pub mod domain;

// 数据仓储层 - 文档存储
pub mod repository;

// 引擎层 - 联合查询流程
pub mod engine;

// 导入层 - 来源数据写入
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 请求/响应边界
pub mod api;

// 应用层 - 进程级状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{FieldValue, Record, SortOrder, SourceKind};

// 引擎
pub use engine::{PickQuery, PickResult, PickSearchEngine};

// API
pub use api::{ApiEnvelope, ImportApi, PickApi, PickRequest, PickResponse};

// 应用
pub use app::AppState;
pub use config::FederationConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "撿貨資訊聯邦查詢引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
