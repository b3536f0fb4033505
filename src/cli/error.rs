//! CLI error types and conversions

use crate::cache::CacheError;
use crate::collector::CollectError;
use crate::fetcher::FetchError;
use crate::persist::PersistError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Fetch error
    #[error("fetch error: {0}")]
    FetchError(#[from] FetchError),

    /// Cache error
    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),

    /// Persistence error
    #[error("database error: {0}")]
    PersistError(#[from] PersistError),

    /// Collection error
    #[error("collection error: {0}")]
    CollectError(#[from] CollectError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
