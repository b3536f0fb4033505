//! HTTP client for the parallelum FIPE API
//!
//! Provides a JSON GET client with:
//! - Per-request timeout
//! - Retry with exponential backoff on transient statuses and transport failures
//! - Optional shared request-rate limiter
//!
//! Every [`FipeHttpClient`] owns its own `reqwest::Client` (and therefore its
//! own connection pool). Workers never share a client.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::retry::{classify_status, classify_transport, format_retry, RetryPolicy};
use super::{FetchError, FetchResult, FetcherFactory, JsonFetcher};

/// Public FIPE API root for passenger cars
pub const DEFAULT_BASE_URL: &str = "https://parallelum.com.br/fipe/api/v1/carros";

/// Per-request time budget (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("fipe-collector/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every client a factory creates
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API root without trailing slash
    pub base_url: String,
    /// Per-request timeout, also used as connect timeout
    pub timeout: Duration,
    /// Attempt budget and backoff
    pub retry: RetryPolicy,
    /// Optional limiter shared across all clients
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            rate_limiter: None,
        }
    }
}

/// JSON GET client with retry
pub struct FipeHttpClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl FipeHttpClient {
    /// Build a client with its own connection pool
    ///
    /// # Errors
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialized
    pub fn new(config: HttpClientConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            rate_limiter: config.rate_limiter,
        })
    }

    /// API root this client targets
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attempt budget per request
    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts
    }

    async fn request_with_retry(&self, path: &str) -> FetchResult<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let max_attempts = self.retry.max_attempts;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if let Some(limiter) = &self.rate_limiter {
                limiter
                    .acquire()
                    .await
                    .map_err(|e| FetchError::RateLimiter(e.to_string()))?;
            }

            let (kind, error) = match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.bytes().await {
                            Ok(body) => {
                                debug!(path, attempt = attempt + 1, "request succeeded");
                                return serde_json::from_slice(&body).map_err(|e| {
                                    FetchError::MalformedResponse(format!(
                                        "invalid JSON from {path}: {e}"
                                    ))
                                });
                            }
                            Err(e) => (classify_transport(&e), transport_error(e)),
                        }
                    } else {
                        (
                            classify_status(status),
                            FetchError::Status {
                                status: status.as_u16(),
                                path: path.to_string(),
                            },
                        )
                    }
                }
                Err(e) => (classify_transport(&e), transport_error(e)),
            };

            if !kind.is_retryable() {
                warn!(path, error = %error, "request failed ({})", kind.description());
                return Err(error);
            }

            if attempt + 1 < max_attempts {
                let wait = self.retry.backoff(attempt);
                warn!(path, "{}", format_retry(attempt + 1, max_attempts, kind, wait));
                last_error = Some(error);
                tokio::time::sleep(wait).await;
            } else {
                warn!(
                    path,
                    error = %error,
                    "giving up after {} attempts ({})",
                    max_attempts,
                    kind.description()
                );
                last_error = Some(error);
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::Network("all attempts exhausted".to_string())))
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

#[async_trait]
impl JsonFetcher for FipeHttpClient {
    async fn get_json(&self, path: &str) -> FetchResult<serde_json::Value> {
        self.request_with_retry(path).await
    }
}

/// Creates one [`FipeHttpClient`] per call, all sharing the same config
#[derive(Debug, Clone, Default)]
pub struct HttpFetcherFactory {
    config: HttpClientConfig,
}

impl HttpFetcherFactory {
    /// Factory for clients built from `config`
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Settings every client receives
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn create(&self) -> FetchResult<Box<dyn JsonFetcher>> {
        Ok(Box::new(FipeHttpClient::new(self.config.clone())?))
    }
}
