//! FipeHttpClient retry behavior against a local server

use crate::support::{canned_server, refused_url};
use fipe_collector::fetcher::http::{FipeHttpClient, HttpClientConfig, HttpFetcherFactory};
use fipe_collector::fetcher::retry::RetryPolicy;
use fipe_collector::fetcher::{FetchError, FetcherFactory, JsonFetcher};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn client(base_url: &str, attempts: u32) -> FipeHttpClient {
    FipeHttpClient::new(HttpClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
        retry: RetryPolicy::new(attempts, Duration::from_millis(1)),
        rate_limiter: None,
    })
    .unwrap()
}

#[tokio::test]
async fn transient_status_is_retried_until_success() {
    let server = canned_server(vec![
        (503, r#"{"error": "busy"}"#),
        (503, r#"{"error": "busy"}"#),
        (200, r#"[{"codigo": "59", "nome": "VW - VolksWagen"}]"#),
    ])
    .await;

    let body = client(&server.base_url, 3).get_json("/marcas").await.unwrap();

    assert_eq!(body[0]["codigo"], "59");
    assert_eq!(server.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_status_gives_up_after_budget() {
    let server = canned_server(vec![(503, "{}")]).await;

    let err = client(&server.base_url, 3).get_json("/marcas").await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 503, .. }), "{err:?}");
    assert_eq!(server.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = canned_server(vec![(404, "{}")]).await;

    let err = client(&server.base_url, 3)
        .get_json("/marcas/999/modelos")
        .await
        .unwrap_err();

    match err {
        FetchError::Status { status, path } => {
            assert_eq!(status, 404);
            assert_eq!(path, "/marcas/999/modelos");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_json_is_malformed_and_not_retried() {
    let server = canned_server(vec![(200, "<html>maintenance</html>")]).await;

    let err = client(&server.base_url, 3).get_json("/marcas").await.unwrap_err();

    assert!(matches!(err, FetchError::MalformedResponse(_)), "{err:?}");
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let url = refused_url().await;

    let err = client(&url, 2).get_json("/marcas").await.unwrap_err();

    assert!(err.is_transport(), "{err:?}");
    assert!(matches!(err, FetchError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn factory_clients_share_configuration() {
    let server = canned_server(vec![(200, r#"{"modelos": [], "anos": []}"#)]).await;
    let factory = HttpFetcherFactory::new(HttpClientConfig {
        base_url: format!("{}/", server.base_url),
        ..HttpClientConfig::default()
    });

    let first = factory.create().unwrap();
    let second = factory.create().unwrap();
    assert!(first.get_json("/marcas/1/modelos").await.unwrap().is_object());
    assert!(second.get_json("/marcas/2/modelos").await.unwrap().is_object());
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}
