//! Main entry point for the fipe-collector CLI

use clap::Parser;
use fipe_collector::cli::{Cli, Commands};
use fipe_collector::shutdown::{self, ShutdownCoordinator};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Env var naming a file that receives a plain-text copy of the log
const LOG_FILE_ENV: &str = "FIPE_LOG_FILE";

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize tracing: stderr (JSON with `LOG_FORMAT=json`), plus an
/// appended log file when `FIPE_LOG_FILE` is set
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fipe_collector=info"));

    let stderr_layer = if json_format {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let log_path = std::env::var_os(LOG_FILE_ENV).filter(|p| !p.is_empty());
    let (file, file_error) = match log_path.as_deref().map(Path::new) {
        Some(path) => match open_log_file(path) {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some((path.display().to_string(), e))),
        },
        None => (None, None),
    };
    let file_layer = file.map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some((path, e)) = file_error {
        tracing::warn!(path = %path, error = %e, "Could not open log file, logging to stderr only");
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenv::dotenv();

    init_tracing();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing with what was collected...");
                shutdown.request_shutdown();
            }
        }
    });

    let result = match cli.command {
        Commands::Import(ref args) => args
            .execute(&cli, shutdown.clone())
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Cache(ref cache_cmd) => cache_cmd.execute(&cli).map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
