//! TTL Cache Module
//!
//! Keyed cache with lazy TTL expiration and least-recently-accessed eviction,
//! used by facility handlers to reuse responses per user and query type.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{secs_to_ms, Clock};
use crate::error::{Error, Result};

// == Access Stamp ==
/// Last access time, with a sequence number so equal timestamps still order
/// by touch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct AccessStamp {
    at: u64,
    seq: u64,
}

// == Cache State ==
#[derive(Debug)]
struct TtlState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Every key in `entries` has exactly one stamp here
    last_access: HashMap<String, AccessStamp>,
    next_seq: u64,
    stats: CacheStats,
}

impl<V> TtlState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_access: HashMap::new(),
            next_seq: 0,
            stats: CacheStats::new(),
        }
    }

    fn touch(&mut self, key: &str, now_ms: u64) {
        let stamp = AccessStamp {
            at: now_ms,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.last_access.insert(key.to_string(), stamp);
    }

    fn remove(&mut self, key: &str) -> bool {
        self.last_access.remove(key);
        self.entries.remove(key).is_some()
    }

    fn least_recently_accessed(&self) -> Option<String> {
        self.last_access
            .iter()
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(key, _)| key.clone())
    }
}

// == TTL Cache ==
/// Thread-safe cache with per-entry TTL and capacity-bounded eviction.
///
/// Expiry is lazy: an entry is only dropped when a read finds it stale or
/// when [`TtlCache::purge_expired`] runs, so [`TtlCache::len`] may count
/// entries that are already dead.
#[derive(Debug)]
pub struct TtlCache<V> {
    state: Mutex<TtlState<V>>,
    ttl_ms: u64,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates a cache holding at most `max_size` entries for `ttl_secs` each.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if either parameter is zero or the TTL
    /// overflows in milliseconds.
    pub fn new(ttl_secs: u64, max_size: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        let ttl_ms = secs_to_ms("ttl_secs", ttl_secs)?;
        if max_size == 0 {
            return Err(Error::non_positive("max_size"));
        }

        Ok(Self {
            state: Mutex::new(TtlState::new()),
            ttl_ms,
            max_size,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, TtlState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// A stale entry is removed before `None` is returned. A live entry has
    /// its access time refreshed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired = state
            .entries
            .get(key)
            .map(|entry| entry.is_expired(now, self.ttl_ms));

        match expired {
            None => {
                state.stats.record_miss();
                None
            }
            Some(true) => {
                state.remove(key);
                state.stats.record_expiration();
                state.stats.record_miss();
                debug!(key, "Cache expired");
                None
            }
            Some(false) => {
                state.touch(key, now);
                state.stats.record_hit();
                state.entries.get(key).map(|entry| entry.value.clone())
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, resetting its store and access times.
    ///
    /// If the key is new and the cache is full, the least recently accessed
    /// entry is evicted first.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_size {
            if let Some(evicted) = state.least_recently_accessed() {
                state.remove(&evicted);
                state.stats.record_eviction();
                debug!(key = %evicted, "Evicted oldest cache entry");
            }
        }

        state.entries.insert(key.clone(), CacheEntry::new(value, now));
        state.touch(&key, now);
        debug!(key = %key, "Cached value");
    }

    // == Get Or Insert ==
    /// Returns the cached value for `key`, building and storing it on a miss.
    ///
    /// `build` runs outside the lock, so two concurrent misses may both build;
    /// the later `set` wins.
    pub fn get_or_insert_with<F>(&self, key: &str, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = build();
        self.set(key, value.clone());
        value
    }

    // == Remove ==
    /// Drops `key` if present. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        let cleared = state.entries.len();
        state.entries.clear();
        state.last_access.clear();
        info!(cleared, "Cache cleared");
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
            state.stats.record_expiration();
        }
        expired.len()
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_ms / 1000
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock(ttl: u64, max: usize) -> (TtlCache<i32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = TtlCache::new(ttl, max, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_cache_rejects_zero_parameters() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            TtlCache::<i32>::new(0, 10, clock.clone()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            TtlCache::<i32>::new(10, 0, clock),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_ttl() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            TtlCache::<u32>::new(u64::MAX, 1, clock.clone()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(TtlCache::<u32>::new(u64::MAX / 1000, 1, clock).is_ok());
    }

    #[test]
    fn test_cache_set_and_get() {
        let (cache, _) = cache_with_clock(300, 10);

        cache.set("find_nearest_water_u1", 7);
        assert_eq!(cache.get("find_nearest_water_u1"), Some(7));
        assert_eq!(cache.get("find_nearest_water_u2"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_expires_at_ttl() {
        let (cache, clock) = cache_with_clock(300, 10);

        cache.set("k", 1);
        clock.advance_ms(299_999);
        assert_eq!(cache.get("k"), Some(1));

        clock.advance_ms(1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "expired entry should be removed on read");
    }

    #[test]
    fn test_cache_overwrite_resets_store_time() {
        let (cache, clock) = cache_with_clock(10, 10);

        cache.set("k", 1);
        clock.advance_secs(8);
        cache.set("k", 2);
        clock.advance_secs(8);

        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_read_does_not_extend_ttl() {
        let (cache, clock) = cache_with_clock(10, 10);

        cache.set("k", 1);
        clock.advance_secs(5);
        assert_eq!(cache.get("k"), Some(1));
        clock.advance_secs(5);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_capacity_scenario() {
        let (cache, _) = cache_with_clock(300, 2);

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_read_protects_from_eviction() {
        let (cache, clock) = cache_with_clock(300, 3);

        cache.set("a", 1);
        clock.advance_ms(10);
        cache.set("b", 2);
        clock.advance_ms(10);
        cache.set("c", 3);
        clock.advance_ms(10);

        assert_eq!(cache.get("a"), Some(1));
        cache.set("d", 4);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_ties_break_in_touch_order() {
        let (cache, _) = cache_with_clock(300, 2);

        // Same timestamp for everything
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get("a");
        cache.set("c", 3);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _) = cache_with_clock(300, 2);

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_len_counts_unread_expired_entries() {
        let (cache, clock) = cache_with_clock(1, 10);

        cache.set("a", 1);
        cache.set("b", 2);
        clock.advance_secs(2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_remove() {
        let (cache, _) = cache_with_clock(300, 10);

        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_get_or_insert_with() {
        let (cache, _) = cache_with_clock(300, 10);
        let mut builds = 0;

        let first = cache.get_or_insert_with("campus_stats_campus1_zh", || {
            builds += 1;
            42
        });
        let second = cache.get_or_insert_with("campus_stats_campus1_zh", || {
            builds += 1;
            0
        });

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(builds, 1);
    }

    #[test]
    fn test_stats_track_outcomes() {
        let (cache, clock) = cache_with_clock(5, 1);

        cache.set("a", 1);
        cache.get("a");
        cache.get("missing");
        cache.set("b", 2);
        clock.advance_secs(5);
        cache.get("b");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_cache_is_shared_across_threads() {
        let (cache, _) = cache_with_clock(300, 50);
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("k{}_{}", t, i), i);
                        cache.get(&format!("k{}_{}", t, i / 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 50);
    }
}
