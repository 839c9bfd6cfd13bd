// ==========================================
// 撿貨資訊聯邦查詢引擎 - 优先级补全合并
// ==========================================
// 职责: 按固定优先级探测各来源，为每个料號收集
//       產品中文名稱 / 單價 / 庫存 三个属性
// 规则:
// - 来源顺序: 產品資料 → 採購與出貨 → 庫存與採購需求 → 客戶需求
// - 每个属性取第一个非空值；NaN 视同空值
// - 三个属性齐备后停止探测该料號
// - 合并只填补缺失，不覆盖需求记录上已有的非空值
// ==========================================

use crate::config::FederationConfig;
use crate::domain::fields::{ENRICHMENT_FIELDS, ITEM_ID};
use crate::domain::{FieldValue, Record, SourceKind};
use crate::engine::fan_out::{FailureStage, SourceFailure, TaggedRecord};
use crate::engine::id_coercion::{candidate_keys, canonical_key};
use crate::repository::{DocumentStore, Filter, Projection};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// 探测结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Found(Record),
    NotFound,
    Failed(String),
}

// ==========================================
// AttributeValues - 单料號补全属性
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeValues {
    values: HashMap<&'static str, FieldValue>,
}

impl AttributeValues {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn is_complete(&self) -> bool {
        ENRICHMENT_FIELDS.iter().all(|f| self.values.contains_key(f))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 用较低优先级的属性补齐尚缺的字段
    fn fill_from(&mut self, other: &AttributeValues) {
        for field in ENRICHMENT_FIELDS {
            if self.values.contains_key(field) {
                continue;
            }
            if let Some(value) = other.values.get(field) {
                self.values.insert(field, value.clone());
            }
        }
    }

    /// 吸收一条来源记录中尚未记录的非空属性，返回新记录的属性数
    fn absorb(&mut self, doc: &Record) -> usize {
        let mut added = 0;
        for field in ENRICHMENT_FIELDS {
            if self.values.contains_key(field) {
                continue;
            }
            if let Some(value) = doc.get_present(field) {
                self.values.insert(field, value.clone());
                added += 1;
            }
        }
        added
    }
}

/// 单来源对一组料號的探测结果
#[derive(Debug, Clone, Default)]
pub struct SourceLookup {
    /// 料號归一键 → 该来源给出的属性
    pub values: HashMap<String, AttributeValues>,
    /// 探测中途失败时，失败前已取得的属性仍保留
    pub failure: Option<SourceFailure>,
}

/// 补全结果
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// 料號归一键 → 属性
    pub values: HashMap<String, AttributeValues>,
    pub failures: Vec<SourceFailure>,
}

// ==========================================
// EnrichmentMerger
// ==========================================
pub struct EnrichmentMerger {
    store: Arc<dyn DocumentStore>,
    config: Arc<FederationConfig>,
}

impl EnrichmentMerger {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<FederationConfig>) -> Self {
        Self { store, config }
    }

    /// 以单个候选键探测一个来源
    pub fn probe(&self, source: SourceKind, key: &FieldValue) -> ProbeOutcome {
        let projection = Projection::of(&ENRICHMENT_FIELDS).without_id();
        let filter = Filter::Eq(ITEM_ID.to_string(), key.clone());
        match self
            .store
            .find_one(self.config.collection(source), &filter, Some(&projection))
        {
            Ok(Some(doc)) => ProbeOutcome::Found(doc),
            Ok(None) => ProbeOutcome::NotFound,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }

    /// 为一组料號收集补全属性
    ///
    /// `ids` 为各料號的原始值（已按归一键去重）；
    /// 某来源探测失败后，本次补全不再探测该来源
    pub fn enrich(&self, ids: &[FieldValue], sources: &[SourceKind]) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        let mut failed_sources: HashSet<SourceKind> = HashSet::new();

        for raw_id in ids {
            let Some(key) = canonical_key(raw_id) else {
                continue;
            };
            let attrs = self.enrich_one(raw_id, sources, &mut failed_sources, &mut report.failures);
            debug!(item_id = %key, resolved = attrs.len(), "料號补全完成");
            report.values.insert(key, attrs);
        }

        info!(
            ids = ids.len(),
            complete = report.values.values().filter(|a| a.is_complete()).count(),
            failed_sources = report.failures.len(),
            "补全探测完成"
        );
        report
    }

    fn enrich_one(
        &self,
        raw_id: &FieldValue,
        sources: &[SourceKind],
        failed_sources: &mut HashSet<SourceKind>,
        failures: &mut Vec<SourceFailure>,
    ) -> AttributeValues {
        let mut attrs = AttributeValues::default();
        let keys = candidate_keys(raw_id);

        'sources: for &source in sources {
            if failed_sources.contains(&source) {
                continue;
            }
            for key in &keys {
                match self.probe(source, key) {
                    ProbeOutcome::Found(doc) => {
                        attrs.absorb(&doc);
                    }
                    ProbeOutcome::NotFound => {}
                    ProbeOutcome::Failed(reason) => {
                        warn!(source = %source, item_id = %raw_id, error = %reason, "补全探测失败");
                        failed_sources.insert(source);
                        failures.push(SourceFailure {
                            source,
                            stage: FailureStage::Enrichment,
                            reason,
                        });
                        continue 'sources;
                    }
                }
                if attrs.is_complete() {
                    break 'sources;
                }
            }
        }

        attrs
    }
}

// ==========================================
// 限时补全（各来源并发探测，再按优先级合并）
// ==========================================
impl EnrichmentMerger {
    /// 以单个来源探测全部料號
    pub fn lookup_source(&self, source: SourceKind, ids: &[FieldValue]) -> SourceLookup {
        let mut result = SourceLookup::default();

        for raw_id in ids {
            let Some(canonical) = canonical_key(raw_id) else {
                continue;
            };
            let mut attrs = AttributeValues::default();
            let mut failure = None;

            for key in candidate_keys(raw_id) {
                match self.probe(source, &key) {
                    ProbeOutcome::Found(doc) => {
                        attrs.absorb(&doc);
                    }
                    ProbeOutcome::NotFound => {}
                    ProbeOutcome::Failed(reason) => {
                        warn!(source = %source, item_id = %raw_id, error = %reason, "补全探测失败");
                        failure = Some(SourceFailure {
                            source,
                            stage: FailureStage::Enrichment,
                            reason,
                        });
                        break;
                    }
                }
                if attrs.is_complete() {
                    break;
                }
            }

            if !attrs.is_empty() {
                result.values.insert(canonical, attrs);
            }
            if failure.is_some() {
                result.failure = failure;
                return result;
            }
        }

        result
    }

    /// 各来源并发探测，每个来源受 `source_timeout` 约束
    ///
    /// 超时的来源记一条 Enrichment 失败，其属性全部放弃；
    /// 未超时时补得的属性与 `enrich` 的顺序探测相同
    pub async fn enrich_bounded(
        self: Arc<Self>,
        ids: &[FieldValue],
        sources: &[SourceKind],
    ) -> EnrichmentReport {
        let timeout = self.config.source_timeout();
        let shared_ids: Arc<Vec<FieldValue>> = Arc::new(ids.to_vec());

        let tasks = sources.iter().map(|&source| {
            let merger = self.clone();
            let ids = shared_ids.clone();
            async move {
                let handle =
                    tokio::task::spawn_blocking(move || merger.lookup_source(source, &ids));
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(lookup)) => lookup,
                    Ok(Err(join_err)) => {
                        warn!(source = %source, error = %join_err, "补全探测任务异常");
                        SourceLookup {
                            values: HashMap::new(),
                            failure: Some(SourceFailure {
                                source,
                                stage: FailureStage::Enrichment,
                                reason: format!("补全任务异常: {}", join_err),
                            }),
                        }
                    }
                    Err(_) => {
                        warn!(source = %source, timeout_ms = timeout.as_millis() as u64, "补全探测超时");
                        SourceLookup {
                            values: HashMap::new(),
                            failure: Some(SourceFailure {
                                source,
                                stage: FailureStage::Enrichment,
                                reason: format!("补全超时 ({}ms)", timeout.as_millis()),
                            }),
                        }
                    }
                }
            }
        });

        // join_all 保持来源优先级顺序
        let lookups = join_all(tasks).await;
        let report = merge_lookups(ids, lookups);

        info!(
            ids = ids.len(),
            complete = report.values.values().filter(|a| a.is_complete()).count(),
            failed_sources = report.failures.len(),
            "限时补全探测完成"
        );
        report
    }
}

/// 按来源优先级合并各来源的探测结果
fn merge_lookups(ids: &[FieldValue], lookups: Vec<SourceLookup>) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();

    for raw_id in ids {
        let Some(key) = canonical_key(raw_id) else {
            continue;
        };
        let mut attrs = AttributeValues::default();
        for lookup in &lookups {
            if attrs.is_complete() {
                break;
            }
            if let Some(found) = lookup.values.get(&key) {
                attrs.fill_from(found);
            }
        }
        report.values.insert(key, attrs);
    }

    report.failures = lookups.into_iter().filter_map(|l| l.failure).collect();
    report
}

/// 提取不同料號（按归一键去重，保留首次出现的原值）
pub fn distinct_ids(records: &[TaggedRecord]) -> Vec<FieldValue> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ids = Vec::new();
    for tagged in records {
        let Some(raw) = tagged.record.get_present(ITEM_ID) else {
            continue;
        };
        if let Some(key) = canonical_key(raw) {
            if seen.insert(key) {
                ids.push(raw.clone());
            }
        }
    }
    ids
}

/// 将补全属性叠加到需求记录副本上（只填补缺失值）
pub fn apply_enrichment(records: Vec<TaggedRecord>, report: &EnrichmentReport) -> Vec<Record> {
    records
        .into_iter()
        .map(|tagged| {
            let mut record = tagged.record;
            let attrs = record
                .get_present(ITEM_ID)
                .and_then(canonical_key)
                .and_then(|key| report.values.get(&key));
            if let Some(attrs) = attrs {
                for field in ENRICHMENT_FIELDS {
                    if record.get_present(field).is_some() {
                        continue;
                    }
                    if let Some(value) = attrs.get(field) {
                        record.insert(field, value.clone());
                    }
                }
            }
            record
        })
        .collect()
}
