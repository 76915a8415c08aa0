/// Best-effort TTL cache on top of the external key-value store.
///
/// Every store failure is logged and degraded to a miss or a no-op; the
/// rest of the pipeline never sees a cache error.
pub mod store;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheSettings;
use crate::errors::StoreError;
use crate::logger::{self, LogTag};
use store::CacheStore;

/// Key holding the merged base token list.
pub const BASE_TOKENS_KEY: &str = "tokens:base";
const HITS_KEY: &str = "cache:stats:hits";
const MISSES_KEY: &str = "cache:stats:misses";

/// Monotonic hit/miss totals for observability.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: i64,
    pub misses: i64,
}

pub struct CacheService {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, settings: &CacheSettings) -> Self {
        Self {
            store,
            ttl: settings.ttl(),
            enabled: settings.enabled,
        }
    }

    /// Default TTL for cached values, from configuration.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a per-address detail lookup. Address-insensitive.
    pub fn detail_key(address: &str) -> String {
        format!("token:detail:{}", address.to_lowercase())
    }

    /// Typed read. `None` on miss, disabled cache, store failure or a
    /// value that no longer deserializes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let raw = match self.store.get(key).await {
            Ok(value) => value?,
            Err(err) => {
                log_store_error("get", key, &err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("discarding undecodable cache entry {}: {}", key, err),
                );
                None
            }
        }
    }

    /// Typed write. Silently a no-op when the cache is disabled; store and
    /// serialization failures are logged and swallowed.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.enabled {
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("failed to serialize cache entry {}: {}", key, err),
                );
                return;
            }
        };

        if let Err(err) = self.store.set(key, &raw, ttl).await {
            log_store_error("set", key, &err);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(err) = self.store.del(key).await {
            log_store_error("del", key, &err);
        }
    }

    /// Drop the base list and every per-address detail entry.
    pub async fn flush_tokens(&self) {
        for pattern in ["tokens:*", "token:detail:*"] {
            if let Err(err) = self.store.scan_delete(pattern).await {
                log_store_error("scan_delete", pattern, &err);
            }
        }
    }

    pub async fn increment_hits(&self) {
        if let Err(err) = self.store.incr(HITS_KEY).await {
            log_store_error("incr", HITS_KEY, &err);
        }
    }

    pub async fn increment_misses(&self) {
        if let Err(err) = self.store.incr(MISSES_KEY).await {
            log_store_error("incr", MISSES_KEY, &err);
        }
    }

    /// Current hit/miss totals. Failures read as zero.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.read_counter(HITS_KEY).await,
            misses: self.read_counter(MISSES_KEY).await,
        }
    }

    async fn read_counter(&self, key: &str) -> i64 {
        match self.store.get(key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(err) => {
                log_store_error("get", key, &err);
                0
            }
        }
    }
}

fn log_store_error(operation: &str, key: &str, err: &StoreError) {
    logger::warning(
        LogTag::Cache,
        &format!("store {} failed for {}: {}", operation, key, err),
    );
}
