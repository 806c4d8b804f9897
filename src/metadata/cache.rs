//! Time-expiring in-memory cache for catalog responses.
//!
//! Entries are fresh while their age is strictly below the expiration. Stale
//! entries are never served; they are dropped on read and by a periodic sweep
//! that runs at most once per cleanup interval.

use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use episonext_common::MediaKind;
use parking_lot::Mutex;

/// Default entry lifetime: 24 hours.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default minimum spacing between sweeps: 1 hour.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Cache key for title lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleKey {
    pub kind: MediaKind,
    pub title: String,
}

impl TitleKey {
    pub fn new(kind: MediaKind, title: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
        }
    }
}

/// Cache key for season episode listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonKey {
    pub provider_id: String,
    pub season_number: u32,
}

impl SeasonKey {
    pub fn new(provider_id: &str, season_number: u32) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            season_number,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

/// Thread-safe cache mapping keys to values stamped with their fetch time.
///
/// Values are cloned out on read, so callers typically store `Arc<T>`.
pub struct MetadataCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    expiration: Duration,
    cleanup_interval: Duration,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

impl<K, V> MetadataCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given entry lifetime and sweep spacing.
    pub fn new(expiration: Duration, cleanup_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            expiration,
            cleanup_interval,
            last_sweep: Mutex::new(None),
        }
    }

    /// Get a fresh value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Get a fresh value for `key`, judging freshness against `now`.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let entry = self.entries.get(key)?;
        if self.is_fresh(entry.fetched_at, now) {
            return Some(entry.value.clone());
        }

        // Stale: drop it unless a concurrent refresh already replaced it
        drop(entry);
        self.entries
            .remove_if(key, |_, e| !self.is_fresh(e.fetched_at, now));
        None
    }

    /// Insert or replace the value for `key`, stamped with the current time.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    /// Insert or replace the value for `key` with an explicit fetch time.
    pub fn insert_at(&self, key: K, value: V, fetched_at: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { value, fetched_at });
    }

    /// Remove every entry whose age has reached the expiration.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| self.is_fresh(entry.fetched_at, now));
        *self.last_sweep.lock() = Some(now);
        before.saturating_sub(self.entries.len())
    }

    /// Sweep if at least one cleanup interval has passed since the last sweep.
    ///
    /// Returns `Some(removed)` when a sweep ran.
    pub fn maybe_sweep(&self, now: DateTime<Utc>) -> Option<usize> {
        {
            let mut last = self.last_sweep.lock();
            if let Some(prev) = *last {
                if age(prev, now) < self.cleanup_interval {
                    return None;
                }
            }
            *last = Some(now);
        }
        Some(self.sweep(now))
    }

    /// Number of entries currently held, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        age(fetched_at, now) < self.expiration
    }
}

impl<K, V> Default for MetadataCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRATION, DEFAULT_CLEANUP_INTERVAL)
    }
}

/// Elapsed time from `since` to `now`; timestamps in the future count as zero.
fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn cache() -> MetadataCache<String, u32> {
        MetadataCache::new(Duration::from_secs(100), Duration::from_secs(50))
    }

    #[test]
    fn test_fresh_entry_is_served() {
        let cache = cache();
        cache.insert_at("a".into(), 1, t0());
        assert_eq!(cache.get_at(&"a".to_string(), t0() + secs(99)), Some(1));
    }

    #[test]
    fn test_entry_at_expiration_is_stale() {
        let cache = cache();
        cache.insert_at("a".into(), 1, t0());
        assert_eq!(cache.get_at(&"a".to_string(), t0() + secs(100)), None);
        // Stale read drops the entry
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_and_restamps() {
        let cache = cache();
        cache.insert_at("a".into(), 1, t0());
        cache.insert_at("a".into(), 2, t0() + secs(90));
        assert_eq!(cache.get_at(&"a".to_string(), t0() + secs(150)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = cache();
        cache.insert_at("old".into(), 1, t0());
        cache.insert_at("new".into(), 2, t0() + secs(60));
        let removed = cache.sweep(t0() + secs(120));
        assert_eq!(removed, 1);
        assert_eq!(cache.get_at(&"new".to_string(), t0() + secs(120)), Some(2));
    }

    #[test]
    fn test_maybe_sweep_respects_interval() {
        let cache = cache();
        cache.insert_at("a".into(), 1, t0());

        assert_eq!(cache.maybe_sweep(t0()), Some(0));
        // Within the cleanup interval: no sweep even though the entry expired
        assert_eq!(cache.maybe_sweep(t0() + secs(49)), None);
        assert_eq!(cache.maybe_sweep(t0() + secs(100)), Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let cache = cache();
        cache.insert_at("a".into(), 1, t0() + secs(10));
        assert_eq!(cache.get_at(&"a".to_string(), t0()), Some(1));
    }

    #[test]
    fn test_keys_distinguish_kind() {
        let cache: MetadataCache<TitleKey, u32> = MetadataCache::default();
        cache.insert(TitleKey::new(MediaKind::Series, "Dune"), 1);
        cache.insert(TitleKey::new(MediaKind::Movie, "Dune"), 2);
        assert_eq!(cache.get(&TitleKey::new(MediaKind::Series, "Dune")), Some(1));
        assert_eq!(cache.get(&TitleKey::new(MediaKind::Movie, "Dune")), Some(2));
    }
}
