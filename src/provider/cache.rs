//! Response cache
//!
//! Injected into the USDA client. Values are raw JSON payloads; expiry is
//! checked lazily on read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Default time-to-live for cached responses (15 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(900);

/// Cache collaborator for provider responses
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value`; `ttl` of `None` uses the cache default
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    fn delete(&self, key: &str);

    fn clear(&self);

    /// Entries currently held (expired ones included until read)
    fn size(&self) -> usize;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Thread-safe in-memory cache with per-entry TTL
#[derive(Debug)]
pub struct InMemoryCache {
    store: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Option<Duration>,
}

impl InMemoryCache {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    fn store(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // a panic while holding the lock cannot leave an entry half-written
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(Some(DEFAULT_TTL))
    }
}

impl ResponseCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut store = self.store();
        match store.get(key) {
            Some(entry) if entry.is_expired() => {
                store.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.store()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.store().remove(key);
    }

    fn clear(&self) {
        self.store().clear();
    }

    fn size(&self) -> usize {
        self.store().len()
    }
}

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl ResponseCache for NullCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) {}

    fn delete(&self, _key: &str) {}

    fn clear(&self) {}

    fn size(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_delete() {
        let cache = InMemoryCache::default();
        cache.set("food:1:abridged", json!({"fdcId": 1}), None);

        assert_eq!(cache.get("food:1:abridged"), Some(json!({"fdcId": 1})));
        assert_eq!(cache.size(), 1);

        cache.delete("food:1:abridged");
        assert_eq!(cache.get("food:1:abridged"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped_on_read() {
        let cache = InMemoryCache::default();
        cache.set("k", json!(1), Some(Duration::ZERO));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_no_default_ttl_never_expires() {
        let cache = InMemoryCache::new(None);
        cache.set("k", json!("v"), None);
        assert_eq!(cache.get("k"), Some(json!("v")));
        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_null_cache() {
        let cache = NullCache;
        cache.set("k", json!(1), None);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.size(), 0);
    }
}
