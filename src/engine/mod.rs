// ==========================================
// 撿貨資訊聯邦查詢引擎 - 引擎层
// ==========================================
// 数据流: date_interval → fan_out → id_coercion/enrichment → finalizer
// 编排: pick_search
// ==========================================

pub mod date_interval;
pub mod enrichment;
pub mod error;
pub mod fan_out;
pub mod finalizer;
pub mod id_coercion;
pub mod pick_search;

// 重导出核心类型
pub use date_interval::{normalize, DateBound, NormalizedInterval};
pub use enrichment::{
    apply_enrichment, distinct_ids, AttributeValues, EnrichmentMerger, EnrichmentReport,
    ProbeOutcome, SourceLookup,
};
pub use error::{EngineError, EngineResult};
pub use fan_out::{
    build_date_filter, FailureStage, FanOutExecutor, FanOutResult, SourceFailure, SourceOutcome,
    TaggedRecord,
};
pub use finalizer::{finalize, sanitize};
pub use id_coercion::{candidate_keys, canonical_key};
pub use pick_search::{PickQuery, PickResult, PickSearchEngine};
