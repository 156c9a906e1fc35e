//! Time-to-live cache around a fallible fetch operation.
//!
//! Repeated refreshes within the TTL window reuse the stored value instead
//! of re-issuing the upstream call. The cache is a performance optimization,
//! not a coherence mechanism: entries expire, last writer for a key wins,
//! and a failing fetch never populates an entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use log::debug;

/// Default window before a cached payload is considered stale.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Keyed TTL cache. Keys must cover the full set of fetch parameters so
/// that calls differing in any parameter occupy distinct entries.
pub struct FetchCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for FetchCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached value for `key` when unexpired; otherwise invokes
    /// `fetch`, stores the result with expiry `now + ttl`, and returns it.
    /// A failing `fetch` propagates untouched and leaves the cache without
    /// an entry for `key`.
    pub fn get_or_fetch<E>(
        &mut self,
        key: K,
        ttl: Duration,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(&key) {
            if entry.expires_at > now {
                debug!("cache hit");
                return Ok(entry.value.clone());
            }
            // Expired entries are misses; drop before refetching so a
            // failed refresh does not resurrect stale data.
            self.entries.remove(&key);
        }
        debug!("cache miss, fetching");
        let value = fetch()?;
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constructs_an_empty_cache() {
        let cache: FetchCache<String, Vec<u32>> = FetchCache::default();
        assert!(cache.is_empty());
    }

    #[test]
    fn second_call_within_ttl_skips_fetch() {
        let mut cache: FetchCache<&str, u32> = FetchCache::new();
        let mut calls = 0;
        for _ in 0..2 {
            let value = cache
                .get_or_fetch("k", Duration::from_secs(60), || {
                    calls += 1;
                    Ok::<_, ()>(7)
                })
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_triggers_refetch() {
        let mut cache: FetchCache<&str, u32> = FetchCache::new();
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_fetch("k", Duration::ZERO, || {
                    calls += 1;
                    Ok::<_, ()>(calls)
                })
                .unwrap();
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn distinct_keys_are_distinct_entries() {
        let mut cache: FetchCache<(i64, i64), u32> = FetchCache::new();
        let mut calls = 0;
        for key in [(1, 100), (1, 200)] {
            cache
                .get_or_fetch(key, Duration::from_secs(60), || {
                    calls += 1;
                    Ok::<_, ()>(0)
                })
                .unwrap();
        }
        assert_eq!(calls, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failing_fetch_does_not_populate() {
        let mut cache: FetchCache<&str, u32> = FetchCache::new();
        let result = cache.get_or_fetch("k", Duration::from_secs(60), || Err::<u32, _>("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());

        let mut calls = 0;
        cache
            .get_or_fetch("k", Duration::from_secs(60), || {
                calls += 1;
                Ok::<_, &str>(1)
            })
            .unwrap();
        assert_eq!(calls, 1);
    }
}
