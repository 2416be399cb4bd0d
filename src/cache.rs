//! TTL result cache keyed by item name and option signature.
//!
//! One mutex guards the whole map; the working set is a few hundred entries at
//! most, and the lock is never held across an `.await`. Stale entries are
//! evicted lazily on read, or in bulk through [`ResultCache::purge_expired`].
//! There is no size bound: TTL is the only eviction pressure.
//!
//! A poisoned lock is treated as an unavailable cache: reads miss, writes are
//! dropped, and callers carry on with a provider call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::provider::{SearchOptions, SearchPayload};

/// Canonical cache key: lower-cased, trimmed item name plus option signature
pub fn cache_key(item_name: &str, options: &SearchOptions) -> String {
    format!(
        "{}|{}",
        item_name.trim().to_lowercase(),
        options.signature()
    )
}

/// Snapshot of cache occupancy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries stored, including stale ones not yet evicted
    pub total_entries: usize,
    /// Entries younger than the TTL
    pub valid_entries: usize,
    /// Configured TTL in hours
    pub ttl_hours: f64,
}

#[derive(Debug)]
struct CacheEntry {
    inserted_at: Instant,
    value: SearchPayload,
}

/// Thread-safe, time-bounded memoization of provider results
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create an empty cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }

    /// Look up a result; stale entries are removed and reported as absent
    pub fn get(&self, item_name: &str, options: &SearchOptions) -> Option<SearchPayload> {
        let key = cache_key(item_name, options);
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(key = %key, "Cache lock poisoned, treating lookup as a miss");
                return None;
            }
        };

        let now = Instant::now();
        let fresh = entries.get(&key).map(|entry| self.is_fresh(entry, now));
        match fresh {
            Some(true) => {
                tracing::debug!(key = %key, "Cache hit");
                entries.get(&key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                entries.remove(&key);
                tracing::debug!(key = %key, "Cache entry expired, evicted");
                None
            }
            None => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Store a result, replacing any previous entry for the same key
    pub fn set(&self, item_name: &str, options: &SearchOptions, value: SearchPayload) {
        let key = cache_key(item_name, options);
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(
                    key,
                    CacheEntry {
                        inserted_at: Instant::now(),
                        value,
                    },
                );
            }
            Err(_) => {
                tracing::warn!(key = %key, "Cache lock poisoned, result not cached");
            }
        }
    }

    /// Drop every entry (also recovers a poisoned cache)
    pub fn clear(&self) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.clear();
        drop(entries);
        self.entries.clear_poison();
    }

    /// Remove every stale entry now; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "Purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> CacheStats {
        let ttl_hours = self.ttl.as_secs_f64() / 3600.0;
        let Ok(entries) = self.entries.lock() else {
            return CacheStats {
                total_entries: 0,
                valid_entries: 0,
                ttl_hours,
            };
        };
        let now = Instant::now();
        CacheStats {
            total_entries: entries.len(),
            valid_entries: entries.values().filter(|e| self.is_fresh(e, now)).count(),
            ttl_hours,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn key_is_case_insensitive_and_option_aware() {
        let plain = SearchOptions::default();
        let related = SearchOptions::with_related();
        assert_eq!(cache_key("Peanut", &plain), cache_key(" peanut ", &plain));
        assert_ne!(cache_key("peanut", &plain), cache_key("peanut", &related));
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_value() {
        let cache = ResultCache::new(24 * HOUR);
        let options = SearchOptions::default();
        cache.set("Shrimp", &options, json!({"papers": 12}));

        assert_eq!(cache.get("shrimp", &options), Some(json!({"papers": 12})));
        assert_eq!(
            cache.get("shrimp", &SearchOptions::with_related()),
            None,
            "different option set must not share an entry"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl_and_is_evicted_on_read() {
        let cache = ResultCache::new(HOUR);
        let options = SearchOptions::default();
        cache.set("egg", &options, json!(1));
        assert_eq!(cache.stats().total_entries, 1);

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;
        assert!(cache.get("egg", &options).is_some(), "still fresh just before ttl");

        tokio::time::advance(Duration::from_secs(1)).await;
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1, "stale entry stays until read");
        assert_eq!(stats.valid_entries, 0);

        assert_eq!(cache.get("egg", &options), None);
        assert_eq!(cache.stats().total_entries, 0, "read evicted the stale entry");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_only_stale_entries() {
        let cache = ResultCache::new(HOUR);
        let options = SearchOptions::default();
        cache.set("old", &options, json!("a"));
        tokio::time::advance(2 * HOUR).await;
        cache.set("new", &options, json!("b"));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", &options).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_restarts_ttl() {
        let cache = ResultCache::new(HOUR);
        let options = SearchOptions::default();
        cache.set("soy", &options, json!(1));
        tokio::time::advance(HOUR / 2).await;
        cache.set("soy", &options, json!(2));
        tokio::time::advance(HOUR / 2).await;

        assert_eq!(cache.get("soy", &options), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = ResultCache::new(Duration::ZERO);
        let options = SearchOptions::default();
        cache.set("wheat", &options, json!(1));
        assert_eq!(cache.get("wheat", &options), None);
    }

    #[test]
    fn clear_and_stats() {
        let cache = ResultCache::new(24 * HOUR);
        let options = SearchOptions::default();
        cache.set("a", &options, json!(1));
        cache.set("b", &options, json!(2));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.ttl_hours, 24.0);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn poisoned_cache_fails_open_until_cleared() {
        let cache = Arc::new(ResultCache::new(24 * HOUR));
        let options = SearchOptions::default();
        cache.set("fish", &options, json!(1));

        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        assert_eq!(cache.get("fish", &options), None, "poisoned read is a miss");
        cache.set("milk", &options, json!(2));
        assert_eq!(cache.len(), 0, "len reports nothing while poisoned");

        cache.clear();
        cache.set("milk", &options, json!(2));
        assert_eq!(cache.get("milk", &options), Some(json!(2)));
    }

    #[test]
    fn concurrent_access_from_threads() {
        let cache = Arc::new(ResultCache::new(24 * HOUR));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let options = SearchOptions::default();
                    for i in 0..50 {
                        let name = format!("item-{}", (t * 50 + i) % 100);
                        cache.set(&name, &options, json!(i));
                        let _ = cache.get(&name, &options);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 100);
    }
}
