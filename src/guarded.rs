//! A [`Shard`] behind a mutex.

use bytes::Bytes;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use crate::shard::Shard;
use crate::stats::{CacheStats, StatsSnapshot};
use crate::storage::Storage;

/// A shard that can be shared between threads.
///
/// Every operation holds the lock for its whole duration, eviction included,
/// so operations on one `GuardedShard` are linearizable. Nothing else here
/// takes a lock: counters live in atomics and are published before the guard
/// is released.
///
/// On its own this is the single-lock LRU backend.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use striped_cache::{GuardedShard, Storage};
///
/// let shard = GuardedShard::new(1024);
/// assert!(shard.put(Bytes::from("key"), Bytes::from("value")));
/// assert_eq!(shard.get(b"key"), Some(Bytes::from("value")));
/// ```
#[derive(Debug)]
pub struct GuardedShard {
    shard: Mutex<Shard>,
    stats: CacheStats,
}

impl GuardedShard {
    /// Create an empty guarded shard with the given byte budget.
    pub fn new(max_size: usize) -> Self {
        Self {
            shard: Mutex::new(Shard::new(max_size)),
            stats: CacheStats::new(),
        }
    }

    /// The shard's byte budget.
    pub fn max_size(&self) -> usize {
        self.lock().max_size()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently charged against the budget.
    pub fn current_size(&self) -> usize {
        self.lock().current_size()
    }

    /// Check for `key` without refreshing its recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.lock().contains(key)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.with_shard(Shard::clear);
    }

    /// Run `f` with exclusive access to the shard, then publish occupancy.
    pub(crate) fn with_shard<R>(&self, f: impl FnOnce(&mut Shard) -> R) -> R {
        let mut shard = self.lock();
        let result = f(&mut shard);
        self.stats
            .set_occupancy(shard.len(), shard.current_size(), shard.evictions());
        result
    }

    /// Acquire the lock. A poisoned lock is taken over: every shard mutation
    /// restores the list, index and size invariants before it can panic.
    fn lock(&self) -> MutexGuard<'_, Shard> {
        self.shard.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("shard lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Storage for GuardedShard {
    fn put(&self, key: Bytes, value: Bytes) -> bool {
        let stored = self.with_shard(|shard| shard.put(key, value));
        self.stats.record_store(stored);
        stored
    }

    fn put_if_absent(&self, key: Bytes, value: Bytes) -> bool {
        let stored = self.with_shard(|shard| shard.put_if_absent(key, value));
        self.stats.record_store(stored);
        stored
    }

    fn set(&self, key: &[u8], value: Bytes) -> bool {
        let stored = self.with_shard(|shard| shard.set(key, value));
        self.stats.record_store(stored);
        stored
    }

    fn delete(&self, key: &[u8]) -> bool {
        let deleted = self.with_shard(|shard| shard.delete(key));
        if deleted {
            self.stats.record_delete();
        }
        deleted
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        let value = self.with_shard(|shard| shard.get(key));
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn max_entry_size(&self) -> usize {
        self.max_size()
    }
}
