//! JSON fetch clients
//!
//! The collector talks to the upstream API exclusively through [`JsonFetcher`],
//! so tests can substitute an in-memory catalog. Each worker obtains its own
//! fetcher from a [`FetcherFactory`] and keeps it for its whole lifetime.

use async_trait::async_trait;

pub mod http;
pub mod rate_limit;
pub mod retry;

/// Fetcher errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connection-level failure (DNS, refused, reset)
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded its time budget
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Non-2xx response after the retry budget was spent, or a non-retryable status
    #[error("HTTP status {status} from {path}")]
    Status {
        /// Response status code
        status: u16,
        /// Request path relative to the base URL
        path: String,
    },

    /// Rate limiter could not grant a permit
    #[error("rate limiter error: {0}")]
    RateLimiter(String),

    /// Response body did not have the expected JSON shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Client could not be constructed
    #[error("client build error: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether the failure came from the transport rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::Status { .. }
        )
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// GET a path relative to the API base URL and decode the body as JSON
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetch `path` (e.g. "/marcas") and return the decoded body
    async fn get_json(&self, path: &str) -> FetchResult<serde_json::Value>;
}

/// Creates one fetcher per worker
pub trait FetcherFactory: Send + Sync {
    /// Build a new, unshared fetcher
    fn create(&self) -> FetchResult<Box<dyn JsonFetcher>>;
}

/// Upstream endpoint paths, relative to the base URL
pub mod paths {
    /// `/marcas`
    pub fn brands() -> String {
        "/marcas".to_string()
    }

    /// `/marcas/{brand}/modelos`
    pub fn models(brand: &str) -> String {
        format!("/marcas/{brand}/modelos")
    }

    /// `/marcas/{brand}/modelos/{model}/anos`
    pub fn years(brand: &str, model: &str) -> String {
        format!("/marcas/{brand}/modelos/{model}/anos")
    }

    /// `/marcas/{brand}/modelos/{model}/anos/{year}`
    pub fn detail(brand: &str, model: &str, year: &str) -> String {
        format!("/marcas/{brand}/modelos/{model}/anos/{year}")
    }
}
