// ==========================================
// 撿貨資訊聯邦查詢引擎 - 撿貨資訊搜尋流程
// ==========================================
// 流程: 输入校验 → 区间规范化 → 扇出查询 → 料號补全 → 清洗排序
// 扇出与补全按来源各自限时，超时来源记入 source_errors
// 约束: 每次调用重新读取全部来源，不缓存任何中间结果
// ==========================================

use crate::config::FederationConfig;
use crate::domain::{Record, SortOrder, SourceKind};
use crate::engine::date_interval::normalize;
use crate::engine::enrichment::{apply_enrichment, distinct_ids, EnrichmentMerger};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fan_out::{FanOutExecutor, SourceFailure};
use crate::engine::finalizer::finalize;
use crate::repository::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// 搜尋条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickQuery {
    /// MIC需求起日
    pub start: String,
    /// MIC需求訖日（为空时等同起日）
    pub end: Option<String>,
    /// 排序字段
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
}

impl PickQuery {
    pub fn single_day(date: &str) -> Self {
        Self {
            start: date.to_string(),
            ..Default::default()
        }
    }

    pub fn range(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: Some(end.to_string()),
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_order = order;
        self
    }
}

/// 搜尋结果（来源失败时为部分结果）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PickResult {
    pub pick: Vec<Record>,
    pub source_errors: Vec<SourceFailure>,
}

impl PickResult {
    pub fn is_partial(&self) -> bool {
        !self.source_errors.is_empty()
    }
}

// ==========================================
// PickSearchEngine
// ==========================================
pub struct PickSearchEngine {
    fan_out: FanOutExecutor,
    merger: Arc<EnrichmentMerger>,
}

impl PickSearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<FederationConfig>) -> Self {
        Self {
            fan_out: FanOutExecutor::new(store.clone(), config.clone()),
            merger: Arc::new(EnrichmentMerger::new(store, config)),
        }
    }

    /// 执行一次撿貨資訊搜尋
    pub async fn search(&self, query: &PickQuery) -> EngineResult<PickResult> {
        let started = Instant::now();
        let (start, end) = validate(query)?;

        let interval = normalize(start, end);
        if interval.is_inverted() {
            return Err(EngineError::InvalidInput(format!(
                "MIC需求訖日 早於 MIC需求起日: {} > {}",
                interval.start.original, interval.end.original
            )));
        }
        info!(
            start = %interval.start.original,
            end = %interval.end.original,
            parsed = interval.day_range().is_some(),
            "开始撿貨資訊搜尋"
        );

        let fan_out = self.fan_out.query_all(&interval).await;

        // 查询阶段已失败的来源不再参与补全，每个来源最多报告一次
        let sources: Vec<SourceKind> = SourceKind::enrichment_priority()
            .into_iter()
            .filter(|s| !fan_out.failures.iter().any(|f| f.source == *s))
            .collect();
        let ids = distinct_ids(&fan_out.records);
        let report = self.merger.clone().enrich_bounded(&ids, &sources).await;

        let merged = apply_enrichment(fan_out.records, &report);
        let pick = finalize(merged, query.sort_field.as_deref(), query.sort_order);

        let mut source_errors = fan_out.failures;
        source_errors.extend(report.failures);

        info!(
            count = pick.len(),
            failed_sources = source_errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "撿貨資訊搜尋完成"
        );

        Ok(PickResult {
            pick,
            source_errors,
        })
    }
}

/// 输入校验: 起日必填，讫日为空时取起日
fn validate(query: &PickQuery) -> EngineResult<(&str, &str)> {
    let start = query.start.trim();
    if start.is_empty() {
        return Err(EngineError::InvalidInput("缺少 MIC需求起日 參數".to_string()));
    }
    let end = query
        .end
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(start);
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_start() {
        assert!(matches!(
            validate(&PickQuery::single_day("  ")),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_defaults_end_to_start() {
        let q = PickQuery {
            start: "2024-01-01".to_string(),
            end: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(validate(&q).unwrap(), ("2024-01-01", "2024-01-01"));
        let q = PickQuery::range("2024-01-01", "2024-01-31");
        assert_eq!(validate(&q).unwrap(), ("2024-01-01", "2024-01-31"));
    }
}
