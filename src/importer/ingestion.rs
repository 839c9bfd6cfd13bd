// ==========================================
// 撿貨資訊聯邦查詢引擎 - 来源数据写入
// ==========================================
// 流程: 文件解析 → 空值规范化 → 紧凑日期展开 → 来源策略 → 空文件拒绝 → 批量写入
// 所有来源共用同一条写入流程，差异只在 NormalizationPolicy
// 不做去重，不做业务校验
// ==========================================

use crate::config::FederationConfig;
use crate::domain::fields::DATE_FIELDS;
use crate::domain::{FieldValue, Record, SourceKind, DATETIME_TEXT_FORMAT};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use crate::repository::DocumentStore;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

// ==========================================
// NormalizationPolicy
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationPolicy {
    /// 日期时间以 ISO 文本落库（YYYY-MM-DDTHH:MM:SS）
    pub datetime_as_text: bool,
}

impl NormalizationPolicy {
    /// Customer-Need 的日期以文本保存，其余来源保留原生日期时间
    pub fn for_source(source: SourceKind) -> Self {
        Self {
            datetime_as_text: matches!(source, SourceKind::CustomerNeed),
        }
    }

    pub fn apply(&self, record: &mut Record) {
        for field in DATE_FIELDS {
            if let Some(value) = record.get_mut(field) {
                if let Some(dt) = compact_date(value) {
                    *value = FieldValue::DateTime(dt);
                }
            }
        }

        for (_, value) in record.iter_mut() {
            if value.is_nan() {
                *value = FieldValue::Null;
                continue;
            }
            if self.datetime_as_text {
                if let FieldValue::DateTime(dt) = value {
                    *value = FieldValue::Text(dt.format(DATETIME_TEXT_FORMAT).to_string());
                }
            }
        }
    }
}

/// 日期字段中的 YYYYMMDD 整数（CSV 推断为 Int）→ 当日 00:00
///
/// 不是合法日期的整数保持原样
fn compact_date(value: &FieldValue) -> Option<chrono::NaiveDateTime> {
    let FieldValue::Int(n) = value else {
        return None;
    };
    if !(10_000_000..=99_999_999).contains(n) {
        return None;
    }
    NaiveDate::parse_from_str(&n.to_string(), "%Y%m%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// 单次写入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub source: SourceKind,
    pub collection: String,
    pub inserted: usize,
}

// ==========================================
// Ingestor
// ==========================================
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    config: Arc<FederationConfig>,
    parser: Arc<dyn FileParser>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<FederationConfig>) -> Self {
        Self::with_parser(store, config, Arc::new(UniversalFileParser))
    }

    pub fn with_parser(
        store: Arc<dyn DocumentStore>,
        config: Arc<FederationConfig>,
        parser: Arc<dyn FileParser>,
    ) -> Self {
        Self {
            store,
            config,
            parser,
        }
    }

    /// 规范化并写入已解析的记录
    pub fn ingest_records(
        &self,
        source: SourceKind,
        mut records: Vec<Record>,
    ) -> ImportResult<IngestSummary> {
        records.retain(|r| !r.is_blank());
        if records.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let policy = NormalizationPolicy::for_source(source);
        for record in records.iter_mut() {
            policy.apply(record);
        }

        let collection = self.config.collection(source).to_string();
        let inserted = self.store.insert_many(&collection, records)?;
        info!(source = %source, collection = %collection, inserted, "来源数据写入完成");

        Ok(IngestSummary {
            source,
            collection,
            inserted,
        })
    }

    /// 解析文件并写入
    #[instrument(skip_all, fields(source = %source))]
    pub fn ingest_file(&self, source: SourceKind, file_path: &Path) -> ImportResult<IngestSummary> {
        let started = Instant::now();
        let records = self.parser.parse_to_records(file_path)?;
        info!(
            file = %file_path.display(),
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "文件解析完成"
        );
        self.ingest_records(source, records)
    }
}

// ==========================================
// SourceImporter Trait（异步入口）
// ==========================================
#[async_trait]
pub trait SourceImporter: Send + Sync {
    /// 导入单个文件到指定来源
    async fn import_file(&self, source: SourceKind, file_path: PathBuf)
        -> ImportResult<IngestSummary>;

    /// 并发导入多个文件，单个文件失败不影响其他文件
    async fn batch_import(
        &self,
        files: Vec<(SourceKind, PathBuf)>,
    ) -> Vec<Result<IngestSummary, String>>;
}

#[async_trait]
impl SourceImporter for Ingestor {
    async fn import_file(
        &self,
        source: SourceKind,
        file_path: PathBuf,
    ) -> ImportResult<IngestSummary> {
        let ingestor = self.clone();
        tokio::task::spawn_blocking(move || ingestor.ingest_file(source, &file_path))
            .await
            .map_err(|e| ImportError::InternalError(e.to_string()))?
    }

    async fn batch_import(
        &self,
        files: Vec<(SourceKind, PathBuf)>,
    ) -> Vec<Result<IngestSummary, String>> {
        use futures::future::join_all;

        info!(count = files.len(), "开始批量导入文件");

        let tasks = files.into_iter().map(|(source, path)| async move {
            let path_str = path.display().to_string();
            match self.import_file(source, path).await {
                Ok(summary) => Ok(summary),
                Err(e) => {
                    error!(file = %path_str, source = %source, error = %e, "文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", path_str, e))
                }
            }
        });
        let results = join_all(tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}
