//! Statistics and metrics for the cache.
//!
//! Each guarded shard owns one [`CacheStats`] block of atomic counters. Reads
//! never take a shard lock, so `stats` requests do not contend with traffic.

use std::iter::Sum;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache operations.
///
/// All counters are atomic and can be safely accessed from multiple threads.
/// Occupancy (`entries`, `bytes`, `evictions`) is published by the owning
/// shard while it still holds its lock, so each value is one the shard
/// actually had.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of get operations that found their key.
    hits: AtomicU64,

    /// Number of get operations that did not.
    misses: AtomicU64,

    /// Number of successful put/put_if_absent/set operations.
    stores: AtomicU64,

    /// Number of put/put_if_absent/set operations that stored nothing.
    rejected: AtomicU64,

    /// Number of delete operations that removed a key.
    deletes: AtomicU64,

    /// Entries evicted due to the byte budget.
    evictions: AtomicU64,

    /// Current number of entries.
    entries: AtomicU64,

    /// Current key + value bytes held.
    bytes: AtomicU64,
}

impl CacheStats {
    /// Create a new stats instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a store operation.
    pub fn record_store(&self, stored: bool) {
        if stored {
            self.stores.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a delete that removed a key.
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the shard's occupancy after an operation.
    pub fn set_occupancy(&self, entries: usize, bytes: usize, evictions: u64) {
        self.entries.store(entries as u64, Ordering::Relaxed);
        self.bytes.store(bytes as u64, Ordering::Relaxed);
        self.evictions.store(evictions, Ordering::Relaxed);
    }

    // Getters for reading statistics

    /// Get the number of cache hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get the number of cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of successful stores.
    pub fn stores(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    /// Get the number of rejected stores.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Get the number of deletes.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Get the number of evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get the current number of entries.
    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    /// Get the current number of bytes held.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            stores: self.stores(),
            rejected: self.rejected(),
            deletes: self.deletes(),
            evictions: self.evictions(),
            entries: self.entries(),
            bytes: self.bytes(),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
///
/// Snapshots of individual shards add up to the snapshot of the whole cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub rejected: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub entries: u64,
    pub bytes: u64,
}

impl StatsSnapshot {
    /// Hit rate as a percentage (0.0 to 100.0).
    /// Returns 0.0 if no lookups have been performed.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl Add for StatsSnapshot {
    type Output = StatsSnapshot;

    fn add(self, other: StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            stores: self.stores + other.stores,
            rejected: self.rejected + other.rejected,
            deletes: self.deletes + other.deletes,
            evictions: self.evictions + other.evictions,
            entries: self.entries + other.entries,
            bytes: self.bytes + other.bytes,
        }
    }
}

impl Sum for StatsSnapshot {
    fn sum<I: Iterator<Item = StatsSnapshot>>(iter: I) -> Self {
        iter.fold(StatsSnapshot::default(), Add::add)
    }
}
