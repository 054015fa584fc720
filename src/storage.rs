//! The storage capability shared by every cache backend.
//!
//! The protocol layer only ever talks to a [`Storage`]. Two backends implement
//! it: [`GuardedShard`](crate::GuardedShard), one LRU behind one lock, and
//! [`ShardedCache`](crate::ShardedCache), many of those striped by key hash.

use bytes::Bytes;
use std::sync::Arc;

use crate::stats::StatsSnapshot;

/// Thread-safe key/value storage with LRU semantics.
///
/// Keys and values are opaque byte strings. An entry costs
/// `key.len() + value.len()` bytes of its backend's budget; an entry larger
/// than the budget it would land in is refused, not truncated.
pub trait Storage: Send + Sync {
    /// Insert or overwrite `key`. `false` only if the entry is too large.
    fn put(&self, key: Bytes, value: Bytes) -> bool;

    /// Insert `key` if absent. `false` if present or too large.
    fn put_if_absent(&self, key: Bytes, value: Bytes) -> bool;

    /// Overwrite an existing `key`. `false` if absent or too large.
    fn set(&self, key: &[u8], value: Bytes) -> bool;

    /// Remove `key`. `false` if it was absent.
    fn delete(&self, key: &[u8]) -> bool;

    /// Fetch `key`, marking it most recently used.
    fn get(&self, key: &[u8]) -> Option<Bytes>;

    /// Current counters for this backend.
    fn stats(&self) -> StatsSnapshot;

    /// Largest `key.len() + value.len()` a single entry may have.
    fn max_entry_size(&self) -> usize;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn put(&self, key: Bytes, value: Bytes) -> bool {
        (**self).put(key, value)
    }

    fn put_if_absent(&self, key: Bytes, value: Bytes) -> bool {
        (**self).put_if_absent(key, value)
    }

    fn set(&self, key: &[u8], value: Bytes) -> bool {
        (**self).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        (**self).delete(key)
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        (**self).get(key)
    }

    fn stats(&self) -> StatsSnapshot {
        (**self).stats()
    }

    fn max_entry_size(&self) -> usize {
        (**self).max_entry_size()
    }
}
