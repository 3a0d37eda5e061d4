use instant::Instant;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory cache for cacheable read responses (stats, analytics).
///
/// Entries expire after a TTL and every place mutation clears the whole
/// cache, matching the server's own invalidate-on-write policy. A
/// capacity of 0 disables caching entirely.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Arc<Mutex<LruCache<String, CachedEntry>>>,
    ttl: Duration,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    value: Arc<Value>,
    stored_at: Instant,
}

impl ResponseCache {
    /// Create a new response cache with the given capacity and TTL
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let enabled = capacity > 0;
        let capacity =
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            enabled,
        }
    }

    /// Get a fresh response from the cache
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        if let Some(entry) = entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.value));
            }
        }
        // Expired entries are dropped on access
        entries.pop(key);
        None
    }

    /// Store a response in the cache
    pub fn store(&self, key: impl Into<String>, value: Value) {
        if !self.enabled {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key.into(),
                CachedEntry {
                    value: Arc::new(value),
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every cached response (called after any place mutation)
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Get the current number of cached responses
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .ok()
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for ResponseCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_cache_basic_operations() {
        let cache = ResponseCache::new(4, Duration::from_secs(60));
        assert!(cache.is_empty());

        cache.store("/stats", serde_json::json!({"total_places": 10}));
        assert_eq!(cache.len(), 1);

        let hit = cache.get("/stats").unwrap();
        assert_eq!(hit["total_places"], 10);
        assert!(cache.get("/analytics/states").is_none());

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_response_cache_ttl_expiry() {
        let cache = ResponseCache::new(4, Duration::from_millis(10));
        cache.store("/stats", serde_json::json!({"total_places": 10}));
        assert!(cache.get("/stats").is_some());

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get("/stats").is_none());
        // Expired entry was evicted, not just hidden
        assert!(cache.is_empty());
    }

    #[test]
    fn test_response_cache_capacity_zero_disables() {
        let cache = ResponseCache::new(0, Duration::from_secs(60));
        cache.store("/stats", serde_json::json!({}));
        assert!(cache.get("/stats").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_response_cache_lru_eviction() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.store("a", serde_json::json!(1));
        cache.store("b", serde_json::json!(2));
        cache.store("c", serde_json::json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }
}
