//! Retry classification and backoff policy for the HTTP client.
//!
//! Only a fixed set of transient statuses (429, 500, 502, 503, 504) and
//! transport failures are retried. Everything else fails on the first attempt.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Total attempts per request (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles on each further retry
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 300;

/// Upper bound for a single backoff sleep
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Statuses treated as transient
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Classification of a failed attempt, used for log messages and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request exceeded the per-call timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, reset
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 500/502/503/504
    TransientServerError(u16),
    /// Any other non-2xx status
    HttpStatus(u16),
    /// Transport failure that fits no other bucket
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside retry log lines.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::TransientServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::HttpStatus(code) => match code {
                404 => "resource not found",
                _ => "unexpected status",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RetryErrorType::HttpStatus(_))
    }
}

/// Classify a non-success status.
pub fn classify_status(status: StatusCode) -> RetryErrorType {
    let code = status.as_u16();
    if code == 429 {
        RetryErrorType::RateLimit
    } else if RETRYABLE_STATUSES.contains(&code) {
        RetryErrorType::TransientServerError(code)
    } else {
        RetryErrorType::HttpStatus(code)
    }
}

/// Classify a transport error raised before any status was received.
pub fn classify_transport(err: &ReqwestError) -> RetryErrorType {
    if err.is_timeout() {
        RetryErrorType::NetworkTimeout
    } else if err.is_connect() {
        RetryErrorType::NetworkOffline
    } else {
        RetryErrorType::NetworkGeneric
    }
}

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub max_attempts: u32,
    /// Sleep before the first retry
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Build a policy; `max_attempts` is clamped to at least one attempt
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Sleep before retry number `retry` (0 for the first retry)
    pub fn backoff(&self, retry: u32) -> Duration {
        let base_ms = self.backoff_base.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(retry));
        Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        )
    }
}

/// Format a retry log line: "attempt 1/3 failed (service unavailable), retrying in 0.3s"
pub fn format_retry(attempt: u32, max_attempts: u32, kind: RetryErrorType, wait: Duration) -> String {
    format!(
        "attempt {}/{} failed ({}), retrying in {:.1}s",
        attempt,
        max_attempts,
        kind.description(),
        wait.as_secs_f64()
    )
}
