//! Cache-first lookups and response shape handling

use crate::support::ScriptedFetcher;
use fipe_collector::cache::{CacheKey, CacheStore};
use fipe_collector::collector::Catalog;
use fipe_collector::fetcher::FetchError;
use serde_json::json;
use tempfile::TempDir;

fn cache(dir: &TempDir) -> CacheStore {
    CacheStore::load(dir.path().join("fipe_cache.json"))
}

#[tokio::test]
async fn models_are_unwrapped_and_cached_as_list() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond(
        "/marcas/59/modelos",
        json!({"modelos": [{"codigo": 5940, "nome": "AMAROK"}], "anos": [{"codigo": "2014-3"}]}),
    );
    let catalog = Catalog::new(&fetcher, &cache);

    let models = catalog.models("59").await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].code, "5940");
    assert_eq!(
        cache.get(&CacheKey::models("59")),
        Some(json!([{"codigo": 5940, "nome": "AMAROK"}]))
    );

    // Served from cache the second time
    catalog.models("59").await.unwrap();
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn models_without_list_are_empty() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond("/marcas/1/modelos", json!({"anos": []}));

    let models = Catalog::new(&fetcher, &cache).models("1").await.unwrap();
    assert!(models.is_empty());
}

#[tokio::test]
async fn non_object_models_response_is_malformed_and_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond("/marcas/1/modelos", json!(["unexpected"]));

    let err = Catalog::new(&fetcher, &cache).models("1").await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn years_accept_plain_codes() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond("/marcas/1/modelos/2/anos", json!(["2014-1", 2015]));

    let years = Catalog::new(&fetcher, &cache).years("1", "2").await.unwrap();
    let codes: Vec<_> = years.into_iter().map(|y| y.code).collect();
    assert_eq!(codes, vec!["2014-1", "2015"]);
}

#[tokio::test]
async fn cached_entries_skip_the_network() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    cache.set(&CacheKey::Brands, json!([{"codigo": "21", "nome": "Fiat"}]));
    let fetcher = ScriptedFetcher::new();

    let brands = Catalog::new(&fetcher, &cache).brands().await.unwrap();
    assert_eq!(brands[0].name, "Fiat");
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn empty_detail_is_returned_but_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond("/marcas/1/modelos/2/anos/2014-1", json!({}));

    let detail = Catalog::new(&fetcher, &cache)
        .detail("1", "2", "2014-1")
        .await
        .unwrap();
    assert_eq!(detail, json!({}));
    assert!(cache.get(&CacheKey::detail("1", "2", "2014-1")).is_none());
}

#[tokio::test]
async fn non_object_detail_is_malformed() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let fetcher = ScriptedFetcher::new().respond("/marcas/1/modelos/2/anos/2014-1", json!("oops"));

    let err = Catalog::new(&fetcher, &cache)
        .detail("1", "2", "2014-1")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
}
