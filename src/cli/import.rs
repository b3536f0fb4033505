//! Import command: connect, ensure schema, collect, persist

use super::{Cli, CliError, OutputFormat};
use crate::cache::CacheStore;
use crate::collector::{
    CollectStats, CollectorConfig, HierarchicalCollector, DEFAULT_BACKLOG_FACTOR,
    DEFAULT_POOL_SIZE, DEFAULT_RECORD_LIMIT,
};
use crate::fetcher::http::{
    HttpClientConfig, HttpFetcherFactory, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::fetcher::rate_limit::RateLimiter;
use crate::fetcher::retry::{RetryPolicy, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS};
use crate::persist::{FipeWriter, WriteReport};
use crate::shutdown::SharedShutdown;
use chrono::{DateTime, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Maximum worker count accepted on the command line
const MAX_WORKERS: usize = 64;

const BANNER_WIDTH: usize = 60;

/// Parse and validate the worker count
fn parse_workers(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if value > MAX_WORKERS {
        return Err(format!("workers {value} exceeds maximum of {MAX_WORKERS}"));
    }
    Ok(value)
}

/// Parse a count that must be at least one
fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(value)
}

/// Import command arguments
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Target database (postgresql://... or sqlite:...)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Stop after collecting this many records
    #[arg(long, env = "FIPE_LIMIT", default_value_t = DEFAULT_RECORD_LIMIT, value_parser = parse_positive)]
    pub limit: usize,

    /// Detail workers (1-64)
    #[arg(long, env = "FIPE_MAX_WORKERS", default_value_t = DEFAULT_POOL_SIZE, value_parser = parse_workers)]
    pub workers: usize,

    /// Outstanding tasks allowed per worker before submission blocks
    #[arg(long, default_value_t = DEFAULT_BACKLOG_FACTOR, value_parser = parse_positive)]
    pub backlog_factor: usize,

    /// API root
    #[arg(long, env = "FIPE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout_secs: u64,

    /// Attempts per request, including the first (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,

    /// Cap on requests per minute across all workers
    #[arg(long, value_parser = parse_positive)]
    pub requests_per_minute: Option<usize>,
}

/// Printed at the end of an import
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    /// Records collected from the API
    pub collected: usize,
    /// Collection counters
    pub collection: CollectStats,
    /// Persistence counters
    pub persistence: WriteReport,
    /// Entries in the response cache after the run
    pub cache_entries: usize,
    /// When the import started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration
    pub elapsed_secs: f64,
}

impl ImportArgs {
    fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            ),
            rate_limiter: self
                .requests_per_minute
                .map(|n| Arc::new(RateLimiter::per_minute(n))),
        }
    }

    /// Execute the import.
    ///
    /// Configuration, connection and schema problems are fatal and surface
    /// before any request reaches the API.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<ImportSummary, CliError> {
        let database_url = self
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CliError::ConfigurationError("DATABASE_URL is not set".to_string()))?;

        let started = Instant::now();
        let started_at = Utc::now();
        let human = cli.output_format == OutputFormat::Human;
        if human {
            print_banner("FIPE PIPELINE - VEHICLE PRICE COLLECTION");
        }

        let writer = FipeWriter::connect(database_url).await?;
        writer.ensure_schema().await?;

        let cache = Arc::new(CacheStore::load(&cli.cache_path));
        let factory = Arc::new(HttpFetcherFactory::new(self.http_config()));
        let config = CollectorConfig::with_pool_size(self.workers).backlog_factor(self.backlog_factor);

        info!(
            limit = self.limit,
            workers = config.workers(),
            max_outstanding = config.max_outstanding(),
            base_url = %self.base_url,
            cache = %cli.cache_path.display(),
            "Starting import"
        );

        let mut collector = HierarchicalCollector::new(config, factory, cache.clone()).with_shutdown(shutdown);
        let progress = human.then(|| create_progress_bar(self.limit));
        if let Some(bar) = &progress {
            collector = collector.with_progress(bar.clone());
        }

        let outcome = collector.collect(self.limit).await?;
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        let report = writer.write(&outcome.records).await;
        writer.close().await;

        let summary = ImportSummary {
            collected: outcome.records.len(),
            collection: outcome.stats,
            persistence: report,
            cache_entries: cache.len(),
            started_at,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };

        match cli.output_format {
            OutputFormat::Human => output_human(&summary),
            OutputFormat::Json => output_json(&summary)?,
        }
        Ok(summary)
    }
}

fn print_banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("\n{rule}");
    println!(" {title}");
    println!("{rule}");
}

fn create_progress_bar(limit: usize) -> ProgressBar {
    let pb = ProgressBar::new(limit as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("records collected");
    pb
}

fn output_human(summary: &ImportSummary) {
    print_banner("IMPORT FINISHED");
    println!("Records collected: {}", summary.collected);
    println!("Stopped because:   {}", summary.collection.stop_reason);
    println!(
        "Leaves:            {} submitted, {} empty, {} failed",
        summary.collection.leaves_submitted,
        summary.collection.leaves_empty,
        summary.collection.leaves_failed
    );
    if summary.collection.lookups_failed > 0 {
        println!("Failed lookups:    {}", summary.collection.lookups_failed);
    }
    println!("Rows submitted:    {}", summary.persistence.submitted);
    println!("Rows inserted:     {}", summary.persistence.inserted);
    if summary.persistence.filtered_out > 0 {
        println!("Filtered out:      {}", summary.persistence.filtered_out);
    }
    if summary.persistence.failed_batches > 0 {
        println!("Failed batches:    {}", summary.persistence.failed_batches);
    }
    println!("Cache entries:     {}", summary.cache_entries);
    println!(
        "Started at:        {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Elapsed:           {:.1}s", summary.elapsed_secs);
}

fn output_json(summary: &ImportSummary) -> Result<(), CliError> {
    let json = serde_json::to_string(summary)
        .map_err(|e| CliError::ConfigurationError(format!("failed to render summary: {e}")))?;
    println!("{json}");
    Ok(())
}
