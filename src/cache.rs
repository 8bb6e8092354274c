//! Bounded LRU cache shadowing the underlying store.
//!
//! The cache is an optimization only: dropping it must never change what a
//! reader observes. It is not locked internally; the owning data store
//! serializes every access.

use indexmap::IndexMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Least-recently-used cache with a fixed capacity.
///
/// Entries are kept in recency order, oldest first. Both `get` hits and
/// `put` count as a use.
#[derive(Debug)]
pub struct CacheManager<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
    stats: CacheStats,
}

impl<K: Hash + Eq, V> CacheManager<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.min(1024)),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Look up a key, marking it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(index) = self.entries.get_index_of(key) else {
            self.stats.misses += 1;
            return None;
        };
        self.stats.hits += 1;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, v)| v)
    }

    /// Insert or replace a value, evicting the least recently used entry if
    /// a new key would exceed the capacity.
    pub fn put(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if let Some(index) = self.entries.get_index_of(&key) {
            self.entries[index] = value;
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
            self.stats.evictions += 1;
            tracing::debug!(capacity = self.capacity, "evicted least recently used cache entry");
        }
        self.entries.insert(key, value);
    }

    /// Remove a key, returning its cached value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.shift_remove(key)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Check for a key without touching recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}
