//! # FIPE Collector Library
//!
//! Collects the FIPE vehicle price catalog (brand → model → year → price
//! detail) from the public parallelum REST API, normalizes the leaf records and
//! persists them idempotently into a relational store.
//!
//! ## Features
//!
//! - **Bounded Concurrency**: detail lookups run on a fixed worker pool with
//!   backpressure on outstanding work
//! - **Global Record Limit**: deterministic stopping rule once enough records
//!   were collected
//! - **Persistent Cache**: every upstream response is memoized in a JSON
//!   snapshot reused across runs
//! - **Retry With Backoff**: transient HTTP failures are retried per request
//! - **Idempotent Writes**: insert-or-ignore on `(codigo_fipe, ano_modelo, combustivel)`
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fipe_collector::cache::CacheStore;
//! use fipe_collector::collector::{CollectorConfig, HierarchicalCollector};
//! use fipe_collector::fetcher::http::HttpFetcherFactory;
//! use fipe_collector::persist::FipeWriter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(CacheStore::load("logs/fipe_cache.json"));
//! let factory = Arc::new(HttpFetcherFactory::default());
//! let collector = HierarchicalCollector::new(CollectorConfig::default(), factory, cache);
//!
//! let writer = FipeWriter::connect("sqlite::memory:").await?;
//! writer.ensure_schema().await?;
//!
//! let outcome = collector.collect(370).await?;
//! let report = writer.write(&outcome.records).await;
//! println!("submitted {} rows", report.submitted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - JSON-over-HTTP client with timeout and retry
//! - [`cache`] - Namespaced, append-only on-disk response cache
//! - [`normalize`] - Raw detail payload to [`CollectedRecord`]
//! - [`collector`] - Hierarchy walk, worker pool and record limit
//! - [`persist`] - Schema creation and batched insert-or-ignore writes
//! - [`cli`] - Command line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// Namespaced response cache
pub mod cache;

/// CLI command implementations
pub mod cli;

/// Hierarchy collection and worker pool
pub mod collector;

/// HTTP fetch clients
pub mod fetcher;

/// Detail payload normalization
pub mod normalize;

/// Relational persistence
pub mod persist;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use cache::{CacheKey, CacheStore};
pub use collector::{CollectOutcome, CollectStats, HierarchicalCollector, StopReason};
pub use persist::{FipeWriter, WriteReport};

/// Vehicle brand (`/marcas`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// Upstream brand code (e.g. "59")
    pub code: String,
    /// Display name (e.g. "VW - VolksWagen")
    pub name: String,
}

/// Vehicle model within a brand (`/marcas/{brand}/modelos`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Upstream model code
    pub code: String,
    /// Display name
    pub name: String,
    /// Code of the owning brand
    pub brand_code: String,
}

/// Year option for a model (`/marcas/{brand}/modelos/{model}/anos`)
///
/// The code is opaque (e.g. "2014-3") or the year itself, depending on the
/// upstream payload. Numeric codes are carried as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOption {
    /// Year code used in the detail URL
    pub code: String,
    /// Display name, when the upstream returned an object
    pub name: Option<String>,
}

/// A fully-specified detail lookup: one (brand, model, year) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Brand code
    pub brand_code: String,
    /// Brand display name, copied into the record
    pub brand_name: String,
    /// Model code
    pub model_code: String,
    /// Model display name, copied into the record
    pub model_name: String,
    /// Year code
    pub year_code: String,
}

impl std::fmt::Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{} ({} {})",
            self.brand_code, self.model_code, self.year_code, self.brand_name, self.model_name
        )
    }
}

/// Normalized price record, the unit the pipeline produces and persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    /// Brand name
    pub marca: String,
    /// Model name
    pub modelo: String,
    /// Model year, null when absent or outside [1900, 2026]
    pub ano_modelo: Option<i32>,
    /// Fuel type (e.g. "Gasolina")
    pub combustivel: Option<String>,
    /// Raw price string as returned upstream (e.g. "R$ 12.345,67")
    pub valor_str: Option<String>,
    /// Parsed price
    pub valor: Option<f64>,
    /// FIPE code (e.g. "005340-6")
    pub codigo_fipe: Option<String>,
    /// Fuel abbreviation (e.g. "G")
    pub sigla_combustivel: Option<String>,
    /// Reference month as reported upstream
    pub data_consulta: Option<String>,
}

impl CollectedRecord {
    /// Whether the record carries every column the uniqueness key and price
    /// analysis need (`codigo_fipe`, `ano_modelo`, `valor`)
    pub fn is_persistable(&self) -> bool {
        self.codigo_fipe.is_some() && self.ano_modelo.is_some() && self.valor.is_some()
    }
}
