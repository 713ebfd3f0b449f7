// In-memory response cache.
// Keyed by endpoint string, entries expire after a per-entry TTL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

/// Default TTL for cached responses: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached response body with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(data: Value, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { data, expires_at }
    }

    /// Expired once the current time is past `expires_at`.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Shared TTL cache for GET-like responses.
///
/// There is no size bound and no LRU ordering; entries leave the cache only
/// when read after expiry, on [`ApiCache::prune_expired`], or through
/// [`ApiCache::clear`].
#[derive(Debug, Default)]
pub struct ApiCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ApiCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `key`, replacing any previous entry.
    pub fn set(&self, key: &str, data: Value, ttl: Duration) {
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry::new(data, ttl));
    }

    /// Store `data` with [`DEFAULT_TTL`].
    pub fn set_default(&self, key: &str, data: Value) {
        self.set(key, data, DEFAULT_TTL);
    }

    /// Return the cached value, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!(key, "cache entry expired");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        }
    }

    /// Clear everything, or only keys containing `pattern`.
    pub fn clear(&self, pattern: Option<&str>) {
        let mut entries = self.entries.lock();
        match pattern {
            None => entries.clear(),
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
        }
    }

    /// Whether a live (unexpired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until they are read or pruned.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backdate(cache: &ApiCache, key: &str) {
        let mut entries = cache.entries.lock();
        let entry = entries.get_mut(key).unwrap();
        entry.expires_at = Utc::now() - chrono::Duration::seconds(1);
    }

    #[test]
    fn test_set_and_get() {
        let cache = ApiCache::new();
        cache.set("/packages", json!([{"id": 1}]), DEFAULT_TTL);

        assert_eq!(cache.get("/packages"), Some(json!([{"id": 1}])));
        assert!(cache.contains("/packages"));
        assert_eq!(cache.get("/destinations"), None);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = ApiCache::new();
        cache.set("/packages", json!("stale"), DEFAULT_TTL);
        backdate(&cache, "/packages");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/packages"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_short_ttl_expires_without_another_set() {
        let cache = ApiCache::new();
        cache.set("/faqs", json!([]), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get("/faqs"), None);
    }

    #[test]
    fn test_set_overwrites_previous_value() {
        let cache = ApiCache::new();
        cache.set("/faqs", json!({"a": 1}), DEFAULT_TTL);
        cache.set("/faqs", json!({"b": 2}), DEFAULT_TTL);

        assert_eq!(cache.get("/faqs"), Some(json!({"b": 2})));
    }

    #[test]
    fn test_clear_by_pattern_keeps_unrelated_keys() {
        let cache = ApiCache::new();
        cache.set("/packages", json!(1), DEFAULT_TTL);
        cache.set("/packages/7", json!(2), DEFAULT_TTL);
        cache.set("/destinations", json!(3), DEFAULT_TTL);

        cache.clear(Some("packages"));

        assert_eq!(cache.get("/packages"), None);
        assert_eq!(cache.get("/packages/7"), None);
        assert_eq!(cache.get("/destinations"), Some(json!(3)));
    }

    #[test]
    fn test_clear_all() {
        let cache = ApiCache::new();
        cache.set("/a", json!(1), DEFAULT_TTL);
        cache.set("/b", json!(2), DEFAULT_TTL);

        cache.clear(None);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune_expired() {
        let cache = ApiCache::new();
        cache.set("/old", json!(1), DEFAULT_TTL);
        cache.set("/fresh", json!(2), DEFAULT_TTL);
        backdate(&cache, "/old");

        assert_eq!(cache.prune_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("/fresh"));
    }
}
