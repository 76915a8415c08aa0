/// Structured error types for the aggregation core.
///
/// Provider and store failures are absorbed at their component boundary
/// (logged, degraded to empty results); these types exist so the seams can
/// still tell callers *why* something came back empty.
use thiserror::Error;

/// Failure of a single upstream provider call.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The provider answered with a rate-limit status (HTTP 429).
    /// Retried with exponential backoff.
    #[error("rate limited upstream (status {status})")]
    RateLimited {
        status: u16,
        retry_after: Option<u64>,
    },

    /// Non-success HTTP status other than 429. Not retried.
    #[error("upstream returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Backoff retries exhausted without a successful call.
    #[error("max retries exceeded for {provider}")]
    MaxRetriesExceeded { provider: String },
}

impl SourceError {
    /// Whether this failure should trigger a backoff retry.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

/// Failure of the external key-value store. Always treated as a cache
/// miss / no-op by the cache layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
