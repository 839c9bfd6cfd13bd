// ==========================================
// 撿貨資訊搜尋 集成测试
// ==========================================
// 测试目标: 扇出查询 → 料號补全 → 清洗排序 全流程
// ==========================================


use chrono::NaiveDate;
use pick_federation::domain::{FieldValue, Record, SortOrder, SourceKind};
use pick_federation::engine::{EngineError, FailureStage, PickQuery, PickSearchEngine};
use pick_federation::repository::DocumentStore;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{create_test_store, seed, FaultyStore};

fn at(y: i32, m: u32, d: u32, h: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn quantities(pick: &[Record]) -> Vec<FieldValue> {
    pick.iter()
        .map(|r| r.get("數量").cloned().unwrap_or(FieldValue::Null))
        .collect()
}

#[tokio::test]
async fn test_single_day_customer_need_enriched_from_product_master() {
    pick_federation::logging::init_test();
    let (_tmp, store, config) = create_test_store().unwrap();

    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-01T08:00:00")
            .with("料號", 2001.0)
            .with("數量", 50)],
    );
    seed(
        store.as_ref(),
        SourceKind::ProductMaster,
        vec![Record::new()
            .with("料號", "2001")
            .with("產品中文名稱", "Widget A")],
    );

    let engine = PickSearchEngine::new(store, config);
    let result = engine
        .search(&PickQuery::range("2024-01-01", "2024-01-01"))
        .await
        .unwrap();

    assert!(!result.is_partial());
    assert_eq!(result.pick.len(), 1);
    let record = &result.pick[0];
    assert_eq!(record.get("MIC需求起日"), Some(&FieldValue::from("2024-01-01")));
    assert!(record
        .get("料號")
        .unwrap()
        .loosely_equals(&FieldValue::Int(2001)));
    assert_eq!(record.get("數量"), Some(&FieldValue::Int(50)));
    assert_eq!(record.get("產品中文名稱"), Some(&FieldValue::from("Widget A")));
}

#[tokio::test]
async fn test_range_sorted_desc_across_three_sources() {
    let (_tmp, store, config) = create_test_store().unwrap();

    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new()
            .with("MIC需求起日", at(2024, 1, 5, 9))
            .with("料號", "P-1")
            .with("數量", 10)],
    );
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024/01/15")
            .with("料號", "P-2")
            .with("數量", 30)],
    );
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-31T23:00:00")
            .with("料號", "P-3")
            .with("數量", 20)],
    );
    // 区间外
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024-02-01")
            .with("料號", "P-4")
            .with("數量", 99)],
    );

    let engine = PickSearchEngine::new(store, config);
    let query = PickQuery::range("2024-01-01", "2024-01-31").sorted_by("數量", SortOrder::Desc);
    let result = engine.search(&query).await.unwrap();

    assert_eq!(
        quantities(&result.pick),
        vec![FieldValue::Int(30), FieldValue::Int(20), FieldValue::Int(10)]
    );
    // 原生日期时间输出为纯日期
    assert_eq!(
        result.pick[2].get("MIC需求起日"),
        Some(&FieldValue::from("2024-01-05"))
    );
}

#[tokio::test]
async fn test_inventory_need_failure_returns_partial_result() {
    let (_tmp, store, config) = create_test_store().unwrap();

    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", "A")],
    );
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", "B")],
    );
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", "C")],
    );

    let faulty: Arc<dyn DocumentStore> =
        Arc::new(FaultyStore::new(store).failing(SourceKind::InventoryNeed.default_collection()));
    let engine = PickSearchEngine::new(faulty, config);
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert!(result.is_partial());
    let ids: Vec<_> = result.pick.iter().filter_map(|r| r.get("料號").cloned()).collect();
    assert_eq!(ids, vec![FieldValue::from("A"), FieldValue::from("C")]);
    assert_eq!(result.source_errors.len(), 1);
    assert_eq!(result.source_errors[0].source, SourceKind::InventoryNeed);
    assert_eq!(result.source_errors[0].stage, FailureStage::Query);
}

#[tokio::test]
async fn test_slow_source_times_out_without_hiding_others() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", "A")],
    );
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", "C")],
    );

    let mut config = (*config).clone();
    config.source_timeout_ms = 50;
    let faulty: Arc<dyn DocumentStore> = Arc::new(
        FaultyStore::new(store).slow(
            SourceKind::CustomerNeed.default_collection(),
            Duration::from_millis(500),
        ),
    );
    let engine = PickSearchEngine::new(faulty, Arc::new(config));
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert_eq!(result.pick.len(), 1);
    // 查询超时的来源不再进入补全，只报告一次
    assert_eq!(result.source_errors.len(), 1);
    assert_eq!(result.source_errors[0].source, SourceKind::CustomerNeed);
    assert_eq!(result.source_errors[0].stage, FailureStage::Query);
}

#[tokio::test]
async fn test_held_write_connection_does_not_block_search() {
    let (_tmp, store, config) = create_test_store().unwrap();
    for source in SourceKind::demand_sources() {
        seed(
            store.as_ref(),
            source,
            vec![Record::new()
                .with("MIC需求起日", "2024-01-01")
                .with("料號", source.as_str())],
        );
    }
    seed(
        store.as_ref(),
        SourceKind::ProductMaster,
        vec![Record::new()
            .with("料號", SourceKind::CustomerNeed.as_str())
            .with("產品中文名稱", "主檔")],
    );

    // 写连接被占用（例如进行中的导入）时，读取仍走独立连接
    let shared = store.connection();
    let _held = shared.lock().unwrap();

    let engine = PickSearchEngine::new(store.clone(), config);
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert_eq!(result.pick.len(), 3);
    assert!(result.source_errors.is_empty(), "{:?}", result.source_errors);
    assert!(result
        .pick
        .iter()
        .any(|r| r.get("產品中文名稱") == Some(&FieldValue::from("主檔"))));
}

#[tokio::test]
async fn test_large_source_does_not_hide_small_sources() {
    let (_tmp, store, config) = create_test_store().unwrap();
    let bulk: Vec<Record> = (0..40_000)
        .map(|i| {
            Record::new()
                .with("MIC需求起日", "2023-06-01")
                .with("料號", i as i64)
                .with("數量", 1)
        })
        .collect();
    seed(store.as_ref(), SourceKind::PurchaseShipping, bulk);
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-01")
            .with("料號", "C-1")
            .with("數量", 5)],
    );

    let mut config = (*config).clone();
    config.source_timeout_ms = 150;
    let engine = PickSearchEngine::new(store, Arc::new(config));
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert_eq!(result.pick.len(), 1);
    assert_eq!(result.pick[0].get("料號"), Some(&FieldValue::from("C-1")));
    // 大集合可能超时，但不得连带其他来源
    assert!(result
        .source_errors
        .iter()
        .all(|e| e.source == SourceKind::PurchaseShipping));
}

#[tokio::test]
async fn test_slow_enrichment_source_is_bounded() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-01")
            .with("料號", "B7")
            .with("庫存", 12)],
    );
    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new()
            .with("MIC需求起日", "2023-01-01")
            .with("料號", "B7")
            .with("單價", 4.0)],
    );
    seed(
        store.as_ref(),
        SourceKind::ProductMaster,
        vec![Record::new().with("料號", "B7").with("產品中文名稱", "慢主檔")],
    );

    let mut config = (*config).clone();
    config.source_timeout_ms = 50;
    let faulty: Arc<dyn DocumentStore> = Arc::new(FaultyStore::new(store).slow(
        SourceKind::ProductMaster.default_collection(),
        Duration::from_millis(600),
    ));
    let engine = PickSearchEngine::new(faulty, Arc::new(config));

    let started = std::time::Instant::now();
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    assert_eq!(result.pick.len(), 1);
    let record = &result.pick[0];
    assert_eq!(record.get("單價"), Some(&FieldValue::Float(4.0)));
    assert_eq!(record.get("庫存"), Some(&FieldValue::Int(12)));
    assert!(record.get("產品中文名稱").is_none());
    assert_eq!(result.source_errors.len(), 1);
    assert_eq!(result.source_errors[0].source, SourceKind::ProductMaster);
    assert_eq!(result.source_errors[0].stage, FailureStage::Enrichment);
}

#[tokio::test]
async fn test_product_master_failure_falls_back_to_demand_sources() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new().with("MIC需求起日", "2024-01-01").with("料號", 1002)],
    );
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![Record::new()
            .with("MIC需求起日", "2023-12-01")
            .with("料號", "1002")
            .with("單價", 7.5)],
    );

    let faulty: Arc<dyn DocumentStore> =
        Arc::new(FaultyStore::new(store).failing(SourceKind::ProductMaster.default_collection()));
    let engine = PickSearchEngine::new(faulty, config);
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert_eq!(result.pick.len(), 1);
    assert_eq!(result.pick[0].get("單價"), Some(&FieldValue::Float(7.5)));
    assert_eq!(result.source_errors.len(), 1);
    assert_eq!(result.source_errors[0].source, SourceKind::ProductMaster);
    assert_eq!(result.source_errors[0].stage, FailureStage::Enrichment);
}

#[tokio::test]
async fn test_fill_missing_and_priority_laws() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-01")
            .with("料號", "1002")
            .with("產品中文名稱", "自有品名")],
    );
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![Record::new()
            .with("MIC需求起日", "2023-06-01")
            .with("料號", 1002.0)
            .with("單價", 9.9)
            .with("庫存", 3)],
    );
    seed(
        store.as_ref(),
        SourceKind::ProductMaster,
        vec![Record::new()
            .with("料號", 1002)
            .with("產品中文名稱", "主檔品名")
            .with("單價", 12.0)
            .with("庫存", f64::NAN)],
    );

    let engine = PickSearchEngine::new(store, config);
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    assert_eq!(result.pick.len(), 1);
    let record = &result.pick[0];
    // 已有品名不被覆盖
    assert_eq!(record.get("產品中文名稱"), Some(&FieldValue::from("自有品名")));
    // 產品資料優先
    assert_eq!(record.get("單價"), Some(&FieldValue::Float(12.0)));
    // NaN 视为缺失，由下一优先级补全
    assert_eq!(record.get("庫存"), Some(&FieldValue::Int(3)));
}

#[tokio::test]
async fn test_single_day_is_superset_of_range_path() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::InventoryNeed,
        vec![
            Record::new().with("MIC需求起日", at(2024, 1, 1, 0)).with("料號", "X1"),
            Record::new().with("MIC需求起日", at(2024, 1, 1, 15)).with("料號", "X2"),
            Record::new().with("MIC需求起日", "2024/1/1").with("料號", "X3"),
            Record::new().with("MIC需求起日", "2024/01/01").with("料號", "X4"),
        ],
    );

    let engine = PickSearchEngine::new(store, config);
    let single = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();
    let range = engine
        .search(&PickQuery::range("2024-01-01", "2024-01-01"))
        .await
        .unwrap();

    for record in &range.pick {
        assert!(single.pick.contains(record));
    }
    assert!(single.pick.len() >= 3);
}

#[tokio::test]
async fn test_results_contain_no_nan_or_internal_fields() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::PurchaseShipping,
        vec![Record::new()
            .with("MIC需求起日", "2024-01-01")
            .with("料號", "N1")
            .with("數量", f64::NAN)],
    );

    let engine = PickSearchEngine::new(store, config);
    let result = engine.search(&PickQuery::single_day("2024-01-01")).await.unwrap();

    for record in &result.pick {
        assert!(!record.contains("_id"));
        assert!(record.iter().all(|(_, v)| !v.is_nan()));
    }
}

#[tokio::test]
async fn test_invalid_input_rejected_before_source_access() {
    let (_tmp, store, config) = create_test_store().unwrap();
    let failing_everywhere: Arc<dyn DocumentStore> = Arc::new(
        SourceKind::ALL
            .iter()
            .fold(FaultyStore::new(store), |s, src| s.failing(src.default_collection())),
    );
    let engine = PickSearchEngine::new(failing_everywhere, config);

    let blank = engine.search(&PickQuery::single_day(" ")).await;
    assert!(matches!(blank, Err(EngineError::InvalidInput(_))));

    let inverted = engine
        .search(&PickQuery::range("2024-02-01", "2024-01-01"))
        .await;
    assert!(matches!(inverted, Err(EngineError::InvalidInput(_))));
}

#[tokio::test]
async fn test_unparseable_dates_degrade_to_text_match() {
    let (_tmp, store, config) = create_test_store().unwrap();
    seed(
        store.as_ref(),
        SourceKind::CustomerNeed,
        vec![
            Record::new().with("MIC需求起日", "TBD").with("料號", "T1"),
            Record::new().with("MIC需求起日", "2024-01-01").with("料號", "T2"),
        ],
    );

    let engine = PickSearchEngine::new(store, config);
    let result = engine.search(&PickQuery::single_day("TBD")).await.unwrap();

    assert_eq!(result.pick.len(), 1);
    assert_eq!(result.pick[0].get("料號"), Some(&FieldValue::from("T1")));
}

#[tokio::test]
async fn test_concurrent_and_sequential_fan_out_agree() {
    use pick_federation::engine::{normalize, FanOutExecutor};

    let (_tmp, store, config) = create_test_store().unwrap();
    for (i, source) in SourceKind::demand_sources().into_iter().enumerate() {
        seed(
            store.as_ref(),
            source,
            vec![
                Record::new().with("MIC需求起日", "2024-03-01").with("數量", i as i64),
                Record::new().with("MIC需求起日", at(2024, 3, 1, 10)).with("數量", 10 + i as i64),
            ],
        );
    }

    let executor = FanOutExecutor::new(store, config);
    let interval = normalize("2024-03-01", "2024-03-01");
    let concurrent = executor.query_all(&interval).await;
    let sequential = executor.query_all_sequential(&interval);

    assert_eq!(concurrent.records, sequential.records);
    assert_eq!(concurrent.records.len(), 6);
    assert!(concurrent.failures.is_empty());
}
