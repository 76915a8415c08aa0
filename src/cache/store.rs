/// External key-value store boundary.
///
/// The aggregation core treats its cache as an opaque networked service
/// with TTL semantics; `MemoryStore` is the in-process implementation the
/// binary runs with and the one tests inject.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::errors::StoreError;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a raw value, or `None` on miss/expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a raw value with a time to live. A zero TTL stores without
    /// expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every key matching a `prefix*` pattern.
    async fn scan_delete(&self, pattern: &str) -> Result<(), StoreError>;

    /// Atomically increment an integer value, creating it at 1.
    /// An existing TTL is preserved.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// (Re)set the remaining time to live of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Thread-safe in-memory TTL store. Expired entries are dropped lazily on
/// access.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn deadline(ttl: Duration) -> Option<Instant> {
        if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Self::deadline(ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }

    async fn scan_delete(&self, pattern: &str) -> Result<(), StoreError> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        self.entries
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.write().unwrap();
        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired() => (
                entry.value.parse::<i64>().unwrap_or(0),
                entry.expires_at,
            ),
            _ => (0, None),
        };

        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Self::deadline(ttl);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set("key", "value", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store.set("key", "value", Duration::from_millis(30)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_counts_and_preserves_expiry() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);

        store.expire("counter", Duration::from_millis(30)).await.unwrap();
        assert_eq!(store.incr("counter").await.unwrap(), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        // Expired counter restarts from scratch.
        assert_eq!(store.incr("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scan_delete_removes_prefix_matches() {
        let store = MemoryStore::new();
        store.set("tokens:base", "a", Duration::ZERO).await.unwrap();
        store.set("tokens:extra", "b", Duration::ZERO).await.unwrap();
        store.set("other", "c", Duration::ZERO).await.unwrap();

        store.scan_delete("tokens:*").await.unwrap();

        assert_eq!(store.get("tokens:base").await.unwrap(), None);
        assert_eq!(store.get("tokens:extra").await.unwrap(), None);
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some("c"));
    }
}
