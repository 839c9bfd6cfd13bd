// ==========================================
// 撿貨資訊聯邦查詢引擎 - 来源扇出查询
// ==========================================
// 职责: 以同一日期区间分别查询三个需求来源，结果带来源标记
// 约束:
// - 过滤条件取超集（宁可多取，不可漏取）
// - 单来源失败/超时只影响该来源，其余来源结果照常返回
// - 并发仅为降低延迟，结果拼接顺序固定（与顺序执行一致）
// ==========================================

use crate::config::FederationConfig;
use crate::domain::fields::{DEMAND_START_DATE, PICK_FIELDS};
use crate::domain::{FieldValue, Record, SourceKind};
use crate::engine::date_interval::NormalizedInterval;
use crate::repository::{DocumentStore, Filter, Projection};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// ==========================================
// 结果类型
// ==========================================

/// 带来源标记的记录
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub source: SourceKind,
    pub record: Record,
}

/// 失败发生阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Query,
    Enrichment,
}

/// 单来源失败信息（随部分结果一并返回）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub stage: FailureStage,
    pub reason: String,
}

/// 单来源查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Found(Vec<TaggedRecord>),
    Failed(SourceFailure),
}

/// 扇出汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutResult {
    pub records: Vec<TaggedRecord>,
    pub failures: Vec<SourceFailure>,
}

impl FanOutResult {
    fn collect(outcomes: Vec<SourceOutcome>) -> Self {
        let mut result = FanOutResult::default();
        for outcome in outcomes {
            match outcome {
                SourceOutcome::Found(records) => result.records.extend(records),
                SourceOutcome::Failed(failure) => result.failures.push(failure),
            }
        }
        result
    }
}

// ==========================================
// 日期过滤条件构建
// ==========================================

/// 构建日期字段的析取过滤条件
///
/// 任一分支成立即匹配:
/// 1. 字段文本等于起/讫日期的原文、斜线变体、短横线变体
/// 2. 字段文本的日期前缀在起讫之间（短横线与斜线两种写法各一组）
/// 3. 两端可解析时，DateTime 字段落在 [起日 00:00, 讫日次日 00:00)
/// 4. 单日区间时，DateTime 字段等于该日的精确时刻或 00:00
pub fn build_date_filter(field: &str, interval: &NormalizedInterval) -> Filter {
    let mut branches: Vec<Filter> = Vec::new();

    let mut texts: Vec<&str> = interval.start.text_variants();
    for v in interval.end.text_variants() {
        if !texts.contains(&v) {
            texts.push(v);
        }
    }
    for text in texts {
        branches.push(Filter::eq(field, text));
    }

    // 日粒度比较: 端点带时刻时只取日期部分，否则同日较晚的文本会被排除
    let pairs = [
        (interval.start.prefix_text('-'), interval.end.prefix_text('-')),
        (interval.start.prefix_text('/'), interval.end.prefix_text('/')),
    ];
    for (i, (low, high)) in pairs.iter().enumerate() {
        if i > 0 && pairs[0] == (low.clone(), high.clone()) {
            continue;
        }
        branches.push(Filter::prefix_between(field, low, high));
    }

    if let Some((lo, hi)) = interval.day_range() {
        branches.push(Filter::And(vec![
            Filter::gte(field, lo),
            Filter::lt(field, hi),
        ]));
    }

    if interval.is_single_day() {
        let mut instants: Vec<FieldValue> = Vec::new();
        for instant in [
            interval.start.instant,
            interval.start.day_start(),
            interval.end.instant,
        ]
        .into_iter()
        .flatten()
        {
            let value = FieldValue::DateTime(instant);
            if !instants.contains(&value) {
                instants.push(value);
            }
        }
        if !instants.is_empty() {
            branches.push(Filter::is_in(field, instants));
        }
    }

    Filter::Or(branches)
}

// ==========================================
// FanOutExecutor - 扇出执行器
// ==========================================
pub struct FanOutExecutor {
    store: Arc<dyn DocumentStore>,
    config: Arc<FederationConfig>,
}

impl FanOutExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<FederationConfig>) -> Self {
        Self { store, config }
    }

    /// 查询单个来源（同步）
    pub fn query(&self, source: SourceKind, interval: &NormalizedInterval) -> SourceOutcome {
        let filter = build_date_filter(DEMAND_START_DATE, interval);
        run_source_query(
            self.store.as_ref(),
            source,
            self.config.collection(source),
            &filter,
        )
    }

    /// 并发查询三个需求来源（每个来源独立超时）
    pub async fn query_all(&self, interval: &NormalizedInterval) -> FanOutResult {
        let filter = build_date_filter(DEMAND_START_DATE, interval);
        let timeout = self.config.source_timeout();

        let tasks = SourceKind::demand_sources().into_iter().map(|source| {
            let store = self.store.clone();
            let collection = self.config.collection(source).to_string();
            let filter = filter.clone();
            async move {
                let handle = tokio::task::spawn_blocking(move || {
                    run_source_query(store.as_ref(), source, &collection, &filter)
                });
                bounded(source, timeout, handle).await
            }
        });

        // join_all 按输入顺序返回，拼接顺序与完成先后无关
        let result = FanOutResult::collect(join_all(tasks).await);
        info!(
            records = result.records.len(),
            failed_sources = result.failures.len(),
            "需求来源扇出查询完成"
        );
        result
    }

    /// 顺序查询三个需求来源（与并发版本输出一致）
    pub fn query_all_sequential(&self, interval: &NormalizedInterval) -> FanOutResult {
        let outcomes = SourceKind::demand_sources()
            .into_iter()
            .map(|source| self.query(source, interval))
            .collect();
        FanOutResult::collect(outcomes)
    }
}

/// 给阻塞读取加上超时，超时/任务异常都折算为该来源失败
async fn bounded(
    source: SourceKind,
    timeout: Duration,
    handle: tokio::task::JoinHandle<SourceOutcome>,
) -> SourceOutcome {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => {
            warn!(source = %source, error = %join_err, "来源查询任务异常");
            SourceOutcome::Failed(SourceFailure {
                source,
                stage: FailureStage::Query,
                reason: format!("查询任务异常: {}", join_err),
            })
        }
        Err(_) => {
            warn!(source = %source, timeout_ms = timeout.as_millis() as u64, "来源查询超时");
            SourceOutcome::Failed(SourceFailure {
                source,
                stage: FailureStage::Query,
                reason: format!("读取超时 ({}ms)", timeout.as_millis()),
            })
        }
    }
}

fn run_source_query(
    store: &dyn DocumentStore,
    source: SourceKind,
    collection: &str,
    filter: &Filter,
) -> SourceOutcome {
    let projection = Projection::of(&PICK_FIELDS);
    match store.find(collection, filter, Some(&projection)) {
        Ok(records) => {
            info!(source = %source, collection, count = records.len(), "来源查询完成");
            SourceOutcome::Found(
                records
                    .into_iter()
                    .map(|record| TaggedRecord { source, record })
                    .collect(),
            )
        }
        Err(e) => {
            warn!(source = %source, collection, error = %e, "来源查询失败");
            SourceOutcome::Failed(SourceFailure {
                source,
                stage: FailureStage::Query,
                reason: e.to_string(),
            })
        }
    }
}
