//! Explicit TTL result caching.
//!
//! Expensive derivations (ingestion, indexing, clustering) are cached
//! keyed by their full input parameter set, with a time-based expiry.
//! This is a plain mapping from key to (value, inserted-at) checked before
//! each expensive call; recomputation on miss or expiry is synchronous.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use log::debug;

/// Default entry lifetime: one day.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A result cache with per-entry time-based expiry.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
    ttl: Duration,
}

impl<K: Eq + Hash, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    /// Create a cache with the default one-day TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Look up a key, evicting the entry first if it has expired.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some((_, inserted)) = self.entries.get(key) {
            if inserted.elapsed() > self.ttl {
                self.entries.remove(key);
                return None;
            }
        }
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Insert or replace an entry, resetting its age.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Fetch the cached value, computing and storing it on miss or expiry.
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> &V
    where
        K: Clone,
    {
        let expired = self
            .entries
            .get(&key)
            .map(|(_, inserted)| inserted.elapsed() > self.ttl)
            .unwrap_or(true);

        if expired {
            debug!("cache miss, recomputing");
            let value = compute();
            self.entries.insert(key.clone(), (value, Instant::now()));
        } else {
            debug!("cache hit");
        }

        // The entry was just inserted if it was absent or expired.
        &self.entries[&key].0
    }

    /// Drop every expired entry.
    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, inserted)| inserted.elapsed() <= ttl);
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries, including any not yet evicted after expiry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
