// ==========================================
// 撿貨資訊聯邦查詢引擎 - 导入层
// ==========================================
// 职责: 外部文件 → 松散类型记录 → 来源集合
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod ingestion;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use ingestion::{IngestSummary, Ingestor, NormalizationPolicy, SourceImporter};
