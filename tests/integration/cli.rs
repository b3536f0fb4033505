//! Binary surface

use assert_cmd::Command;
use tempfile::TempDir;

fn command(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fipe-collector").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DATABASE_URL")
        .env_remove("FIPE_CACHE_PATH")
        .env_remove("FIPE_LIMIT")
        .env_remove("FIPE_MAX_WORKERS")
        .env_remove("FIPE_BASE_URL")
        .env_remove("RUST_LOG")
        .env_remove("LOG_FORMAT")
        .env_remove("FIPE_LOG_FILE");
    cmd
}

#[test]
fn import_without_database_url_fails_before_collecting() {
    let dir = TempDir::new().unwrap();
    let output = command(&dir)
        .args(["import", "--base-url", "http://127.0.0.1:9", "--limit", "1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DATABASE_URL"), "stderr: {stderr}");
    assert!(!dir.path().join("logs").exists(), "no cache may be written");
}

#[test]
fn import_with_unsupported_database_fails() {
    let dir = TempDir::new().unwrap();
    command(&dir)
        .args([
            "import",
            "--database-url",
            "mysql://root@localhost/fipe",
            "--base-url",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure();
}

#[test]
fn import_rejects_zero_limit() {
    let dir = TempDir::new().unwrap();
    command(&dir)
        .args(["import", "--database-url", "sqlite::memory:", "--limit", "0"])
        .assert()
        .failure();
}

#[test]
fn cache_inspect_reports_empty_cache_as_json() {
    let dir = TempDir::new().unwrap();
    let output = command(&dir)
        .args(["--output-format", "json", "cache", "inspect"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total"], 0);
    assert_eq!(report["exists"], false);
}

#[test]
fn cache_clear_deletes_snapshot() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");
    std::fs::write(&cache_path, r#"{"marcas": []}"#).unwrap();

    command(&dir)
        .args(["--cache-path", cache_path.to_str().unwrap(), "cache", "clear"])
        .assert()
        .success();
    assert!(!cache_path.exists());
}

#[test]
fn log_file_receives_a_copy_of_the_log() {
    let dir = TempDir::new().unwrap();
    command(&dir)
        .env("FIPE_LOG_FILE", "logs/logs.txt")
        .args(["import", "--base-url", "http://127.0.0.1:9", "--limit", "1"])
        .assert()
        .failure();

    let log = std::fs::read_to_string(dir.path().join("logs/logs.txt")).unwrap();
    assert!(log.contains("DATABASE_URL is not set"), "log: {log}");
    assert!(!log.contains("\u{1b}["), "file log carries no color codes");
}
