//! Import command end to end against a local catalog server

use crate::support::{catalog_server, MockCatalog};
use assert_cmd::Command;
use clap::Parser;
use fipe_collector::cli::{Cli, Commands};
use fipe_collector::shutdown::ShutdownCoordinator;
use fipe_collector::{CacheStore, FipeWriter, StopReason};
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn import_collects_persists_and_reports_json() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("fipe_cache.json");
    let server = catalog_server(MockCatalog::new(2, 2, 2)).await;

    let cli = Cli::try_parse_from([
        "fipe-collector",
        "--output-format",
        "json",
        "--cache-path",
        cache_path.to_str().unwrap(),
        "import",
        "--database-url",
        "sqlite::memory:",
        "--base-url",
        &server.base_url,
        "--limit",
        "5",
        "--workers",
        "2",
    ])
    .unwrap();
    let Commands::Import(args) = &cli.command else {
        panic!("expected the import command");
    };

    let summary = args
        .execute(&cli, ShutdownCoordinator::shared())
        .await
        .unwrap();

    assert_eq!(summary.collection.stop_reason, StopReason::LimitReached);
    assert_eq!(summary.persistence.inserted, 5);
    assert_eq!(summary.persistence.failed_batches, 0);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["collected"], 5);
    assert_eq!(json["persistence"]["submitted"], 5);
    assert_eq!(json["collection"]["stop_reason"], "limit_reached");

    assert!(cache_path.exists(), "cache snapshot is written");
    assert_eq!(CacheStore::load(&cache_path).len(), summary.cache_entries);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn import_binary_fills_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("fipe_cache.json");
    let db_url = format!("sqlite://{}", dir.path().join("fipe.db").display());
    let server = catalog_server(MockCatalog::new(2, 3, 2)).await;

    let output = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        let cache_path = cache_path.clone();
        let db_url = db_url.clone();
        let base_url = server.base_url.clone();
        move || {
            Command::cargo_bin("fipe-collector")
                .unwrap()
                .current_dir(dir)
                .env_remove("RUST_LOG")
                .env_remove("LOG_FORMAT")
                .env_remove("FIPE_LOG_FILE")
                .args([
                    "--output-format",
                    "json",
                    "--cache-path",
                    cache_path.to_str().unwrap(),
                    "import",
                    "--database-url",
                    &db_url,
                    "--base-url",
                    &base_url,
                    "--limit",
                    "100",
                ])
                .output()
                .unwrap()
        }
    })
    .await
    .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["collected"], 12);
    assert_eq!(summary["persistence"]["submitted"], 12);
    assert_eq!(summary["collection"]["stop_reason"], "exhausted");
    assert!(cache_path.exists());

    let writer = FipeWriter::connect(&db_url).await.unwrap();
    assert_eq!(writer.count().await.unwrap(), 12);
    writer.close().await;
}
