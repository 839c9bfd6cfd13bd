// ==========================================
// 撿貨資訊聯邦查詢引擎 - 应用层
// ==========================================
// 职责: 组装仓储、配置与API，供 CLI 调用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
