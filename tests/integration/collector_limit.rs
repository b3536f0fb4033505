//! Record limit, exhaustion and failure isolation

use crate::support::MockCatalog;
use fipe_collector::collector::{CollectorConfig, HierarchicalCollector, StopReason};
use fipe_collector::shutdown::ShutdownCoordinator;
use fipe_collector::CacheStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn collector(catalog: &MockCatalog, config: CollectorConfig, dir: &TempDir) -> HierarchicalCollector {
    let cache = Arc::new(CacheStore::load(dir.path().join("fipe_cache.json")));
    HierarchicalCollector::new(config, catalog.factory(), cache)
        .with_shutdown(ShutdownCoordinator::shared())
}

#[tokio::test]
async fn limit_five_of_eight_leaves_never_fetches_the_rest() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 2, 2);
    let config = CollectorConfig::with_pool_size(1).backlog_factor(1);

    let outcome = collector(&catalog, config, &dir).collect(5).await.unwrap();

    assert_eq!(outcome.records.len(), 5);
    assert_eq!(outcome.stats.stop_reason, StopReason::LimitReached);
    assert_eq!(outcome.stats.leaves_submitted, 5);
    assert_eq!(catalog.counters.detail_calls(), 5);
}

#[tokio::test]
async fn parallel_pool_returns_exactly_the_limit() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(3, 4, 5);
    let config = CollectorConfig::default();

    let outcome = collector(&catalog, config, &dir).collect(17).await.unwrap();

    assert_eq!(outcome.records.len(), 17);
    assert_eq!(outcome.stats.stop_reason, StopReason::LimitReached);
    assert!(catalog.counters.detail_calls() >= 17);
    assert!(catalog.counters.detail_calls() <= 17 + config.max_outstanding());

    let codes: HashSet<_> = outcome
        .records
        .iter()
        .map(|r| r.codigo_fipe.clone())
        .collect();
    assert_eq!(codes.len(), 17, "every record comes from a distinct leaf");
}

#[tokio::test]
async fn small_catalog_is_exhausted() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 3, 2);

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(100)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), catalog.leaves());
    assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.stats.brands, 2);
    assert_eq!(outcome.stats.models, 6);
    assert_eq!(outcome.stats.leaves_submitted, 12);
}

#[tokio::test]
async fn limit_equal_to_catalog_size_collects_everything() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 2, 2);

    let outcome = collector(&catalog, CollectorConfig::with_pool_size(2), &dir)
        .collect(8)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 8);
    assert_eq!(catalog.counters.detail_calls(), 8);
}

#[tokio::test]
async fn failed_detail_is_skipped() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 2, 2).failing("/marcas/b0/modelos/m1/anos/2001-1");

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(100)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 7);
    assert_eq!(outcome.stats.leaves_failed, 1);
    assert_eq!(outcome.stats.stop_reason, StopReason::Exhausted);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.codigo_fipe.as_deref() != Some("b0-m1-2001-1")));
}

#[tokio::test]
async fn empty_detail_yields_no_record() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(1, 1, 3).empty("/marcas/b0/modelos/m0/anos/2000-1");

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(100)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.stats.leaves_empty, 1);
}

#[tokio::test]
async fn failed_model_lookup_skips_the_brand() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 2, 2).failing("/marcas/b0/modelos");

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(100)
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.stats.lookups_failed, 1);
    assert!(outcome.records.iter().all(|r| r.marca == "Brand b1"));
}

#[tokio::test]
async fn failed_brand_lookup_collects_nothing() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(2, 2, 2).failing("/marcas");

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(100)
        .await
        .unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.stats.lookups_failed, 1);
    assert_eq!(catalog.counters.detail_calls(), 0);
}

#[tokio::test]
async fn records_carry_hierarchy_names() {
    let dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new(1, 1, 1);

    let outcome = collector(&catalog, CollectorConfig::default(), &dir)
        .collect(1)
        .await
        .unwrap();

    let record = &outcome.records[0];
    assert_eq!(record.marca, "Brand b0");
    assert_eq!(record.modelo, "Model m0");
    assert_eq!(record.ano_modelo, Some(2000));
    assert_eq!(record.valor, Some(10000.0));
    assert!(record.is_persistable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn limit_reached_leaves_cache_flushed_and_settled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fipe_cache.json");
    let catalog = MockCatalog::new(3, 3, 5).with_detail_delay(Duration::from_millis(20));
    let cache = Arc::new(CacheStore::load(&path));
    let collector = HierarchicalCollector::new(CollectorConfig::with_pool_size(4), catalog.factory(), cache.clone())
        .with_shutdown(ShutdownCoordinator::shared());

    let outcome = collector.collect(3).await.unwrap();
    assert_eq!(outcome.stats.stop_reason, StopReason::LimitReached);
    assert_eq!(outcome.records.len(), 3);
    assert!(!cache.is_dirty(), "in-flight lookups finish before the flush");

    let details = catalog.counters.detail_calls();
    let entries = cache.len();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(catalog.counters.detail_calls(), details, "no lookup runs after collect returns");
    assert_eq!(cache.len(), entries);
    assert!(!cache.is_dirty());
    assert_eq!(CacheStore::load(&path).len(), entries, "snapshot holds every memoized response");
}
