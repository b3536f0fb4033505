//! Hierarchical catalog collection
//!
//! [`HierarchicalCollector`] walks brands, models and years sequentially on
//! the coordinator and fans detail lookups out to a fixed-size worker pool,
//! stopping as soon as the global record limit is met.

pub mod catalog;
pub mod config;
pub mod executor;
pub mod pool;

pub use catalog::Catalog;
pub use config::{CollectorConfig, DEFAULT_BACKLOG_FACTOR, DEFAULT_POOL_SIZE, DEFAULT_RECORD_LIMIT};
pub use executor::{CollectOutcome, CollectStats, HierarchicalCollector, StopReason};
pub use pool::LeafOutcome;

use crate::fetcher::FetchError;

/// Collection errors
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The coordinator's fetcher could not be created
    #[error("failed to create fetch client: {0}")]
    Client(#[source] FetchError),
}
