/// Shared HTTP plumbing for the provider clients: per-provider rate
/// limiting with exponential backoff, and the reqwest wrapper that
/// classifies upstream failures.
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::store::CacheStore;
use crate::config::{BackoffSettings, RateLimitConfig};
use crate::errors::SourceError;
use crate::logger::{self, LogTag};

// ============================================================================
// RATE LIMITER
// ============================================================================

/// Tracks per-provider request counts in fixed wall-clock windows.
///
/// Counters live in the shared store under `rate:{provider}:{minute}`;
/// the minute in the key makes buckets reset naturally without cleanup.
/// Providers without a configured limit are unlimited, and store failures
/// count as available capacity (rate limiting is best effort).
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    limits: HashMap<String, RateLimitConfig>,
    backoff: BackoffSettings,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CacheStore>,
        limits: HashMap<String, RateLimitConfig>,
        backoff: BackoffSettings,
    ) -> Self {
        Self {
            store,
            limits,
            backoff,
        }
    }

    fn bucket_key(provider: &str) -> String {
        let minute = chrono::Utc::now().timestamp_millis() / 60_000;
        format!("rate:{}:{}", provider, minute)
    }

    /// Whether the provider's current window still has capacity.
    pub async fn try_reserve(&self, provider: &str) -> bool {
        let Some(limit) = self.limits.get(provider) else {
            return true;
        };

        match self.store.get(&Self::bucket_key(provider)).await {
            Ok(Some(count)) => count
                .parse::<i64>()
                .map(|used| used < i64::from(limit.max))
                .unwrap_or(true),
            Ok(None) => true,
            Err(err) => {
                logger::warning(
                    LogTag::Api,
                    &format!("rate counter read failed for {}: {}", provider, err),
                );
                true
            }
        }
    }

    /// Count one request against the provider's current window. The first
    /// increment of a bucket arms its expiry.
    async fn record_request(&self, provider: &str) {
        let Some(limit) = self.limits.get(provider) else {
            return;
        };

        let key = Self::bucket_key(provider);
        match self.store.incr(&key).await {
            Ok(1) => {
                if let Err(err) = self
                    .store
                    .expire(&key, Duration::from_millis(limit.window_ms))
                    .await
                {
                    logger::warning(
                        LogTag::Api,
                        &format!("failed to arm rate bucket {}: {}", key, err),
                    );
                }
            }
            Ok(_) => {}
            Err(err) => {
                logger::warning(
                    LogTag::Api,
                    &format!("rate counter increment failed for {}: {}", provider, err),
                );
            }
        }
    }

    /// Remaining capacity in the current window, `None` when unlimited.
    pub async fn remaining_requests(&self, provider: &str) -> Option<u32> {
        let limit = self.limits.get(provider)?;

        let used = match self.store.get(&Self::bucket_key(provider)).await {
            Ok(Some(count)) => count.parse::<u32>().unwrap_or(0),
            _ => 0,
        };
        Some(limit.max.saturating_sub(used))
    }

    /// Run `operation`, reserving window capacity first and retrying
    /// rate-limit failures with exponential backoff. Any other failure
    /// propagates immediately.
    pub async fn execute_with_backoff<T, F, Fut>(
        &self,
        provider: &str,
        mut operation: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        for attempt in 0..self.backoff.max_retries {
            if self.try_reserve(provider).await {
                self.record_request(provider).await;

                match operation().await {
                    Ok(value) => return Ok(value),
                    Err(err) if err.is_rate_limit() => {
                        let delay = backoff_delay(&self.backoff, attempt);
                        logger::warning(
                            LogTag::Api,
                            &format!(
                                "{} rate limited upstream, retrying in {}ms",
                                provider,
                                delay.as_millis()
                            ),
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(err) => return Err(err),
                }
            } else {
                let delay = backoff_delay(&self.backoff, attempt);
                logger::warning(
                    LogTag::Api,
                    &format!(
                        "request window exhausted for {}, waiting {}ms",
                        provider,
                        delay.as_millis()
                    ),
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(SourceError::MaxRetriesExceeded {
            provider: provider.to_string(),
        })
    }
}

/// Delay before the retry following attempt `attempt` (zero-based):
/// `initial * multiplier^attempt`, capped at the configured maximum.
pub fn backoff_delay(settings: &BackoffSettings, attempt: u32) -> Duration {
    let factor = u64::from(settings.multiplier).saturating_pow(attempt);
    let ms = settings
        .initial_delay_ms
        .saturating_mul(factor)
        .min(settings.max_delay_ms);
    Duration::from_millis(ms)
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

/// Thin reqwest wrapper: JSON GET with a per-request timeout, mapping
/// HTTP 429 to the retryable rate-limit error.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Network(err.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let mut request = self.client.get(url).timeout(self.timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|err| SourceError::Network(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok());
            return Err(SourceError::RateLimited {
                status: status.as_u16(),
                retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| SourceError::Network(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_backoff() -> BackoffSettings {
        BackoffSettings {
            initial_delay_ms: 1,
            max_retries: 5,
            multiplier: 2,
            max_delay_ms: 8,
        }
    }

    fn limiter(limits: HashMap<String, RateLimitConfig>) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), limits, fast_backoff())
    }

    fn limited(provider: &str, max: u32) -> HashMap<String, RateLimitConfig> {
        HashMap::from([(
            provider.to_string(),
            RateLimitConfig {
                max,
                window_ms: 60_000,
            },
        )])
    }

    #[test]
    fn backoff_delays_grow_and_cap() {
        let settings = BackoffSettings {
            initial_delay_ms: 1_000,
            max_retries: 5,
            multiplier: 2,
            max_delay_ms: 32_000,
        };

        let delays: Vec<u64> = (0..7)
            .map(|attempt| backoff_delay(&settings, attempt).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 32_000]);
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn try_reserve_enforces_window_capacity() {
        let limiter = limiter(limited("dexscreener", 2));

        assert!(limiter.try_reserve("dexscreener").await);
        limiter.record_request("dexscreener").await;
        assert!(limiter.try_reserve("dexscreener").await);
        limiter.record_request("dexscreener").await;

        assert!(!limiter.try_reserve("dexscreener").await);
        assert_eq!(limiter.remaining_requests("dexscreener").await, Some(0));
    }

    #[tokio::test]
    async fn unconfigured_providers_are_unlimited() {
        let limiter = limiter(HashMap::new());

        for _ in 0..100 {
            assert!(limiter.try_reserve("anything").await);
            limiter.record_request("anything").await;
        }
        assert_eq!(limiter.remaining_requests("anything").await, None);
    }

    #[tokio::test]
    async fn rate_limited_operation_retries_until_exhaustion() {
        let limiter = limiter(HashMap::new());
        let attempts = AtomicU32::new(0);

        let outcome: Result<(), SourceError> = limiter
            .execute_with_backoff("jupiter", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SourceError::RateLimited {
                        status: 429,
                        retry_after: None,
                    })
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert!(matches!(
            outcome,
            Err(SourceError::MaxRetriesExceeded { provider }) if provider == "jupiter"
        ));
    }

    #[tokio::test]
    async fn non_rate_limit_errors_propagate_immediately() {
        let limiter = limiter(HashMap::new());
        let attempts = AtomicU32::new(0);

        let outcome: Result<(), SourceError> = limiter
            .execute_with_backoff("jupiter", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::Network("connection reset".to_string())) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome, Err(SourceError::Network(_))));
    }

    #[tokio::test]
    async fn successful_operation_returns_on_first_attempt() {
        let limiter = limiter(limited("gecko", 10));

        let outcome = limiter
            .execute_with_backoff("gecko", || async { Ok(42) })
            .await;

        assert_eq!(outcome.unwrap(), 42);
        assert_eq!(limiter.remaining_requests("gecko").await, Some(9));
    }

    #[tokio::test]
    async fn exhausted_window_fails_after_retries_without_calling_operation() {
        let limiter = limiter(limited("gecko", 1));
        limiter.record_request("gecko").await;
        let attempts = AtomicU32::new(0);

        let outcome: Result<(), SourceError> = limiter
            .execute_with_backoff("gecko", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(matches!(
            outcome,
            Err(SourceError::MaxRetriesExceeded { .. })
        ));
    }
}
