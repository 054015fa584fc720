//! The sharded cache.
//!
//! This module provides [`ShardedCache`], the type the server stores into. It
//! stripes the keyspace over a fixed set of [`GuardedShard`]s so that
//! operations on different shards never wait for each other.

use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;
use tracing::info;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::guarded::GuardedShard;
use crate::stats::StatsSnapshot;
use crate::storage::Storage;

/// A thread-safe, byte-budgeted LRU cache striped over independent shards.
///
/// Each key lives in exactly one shard, chosen by hashing every byte of the
/// key. Each shard gets `max_size / shard_count` bytes and evicts on its own;
/// no operation ever touches two shards.
///
/// Cloning a `ShardedCache` creates a new handle to the same shards.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use striped_cache::{CacheConfig, ShardedCache, Storage};
///
/// let config = CacheConfig::new()
///     .shard_count(4)
///     .max_size(4 * 1024 * 1024)
///     .build();
///
/// let cache = ShardedCache::new(config)?;
///
/// assert!(cache.put(Bytes::from("user:123"), Bytes::from("Alice")));
/// assert_eq!(cache.get(b"user:123"), Some(Bytes::from("Alice")));
///
/// let stats = cache.stats();
/// println!("Hit rate: {:.1}%", stats.hit_rate());
/// # Ok::<(), striped_cache::CacheError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ShardedCache {
    shards: Arc<[GuardedShard]>,
}

impl ShardedCache {
    /// Create a new cache with the given configuration.
    ///
    /// # Errors
    /// [`CacheError::ShardConfigurationInvalid`] if `shard_count` is zero or
    /// a shard's share of `max_size` is below `min_shard_size`.
    ///
    /// ```
    /// use striped_cache::{CacheConfig, CacheError, ShardedCache};
    ///
    /// let config = CacheConfig::new().shard_count(8).max_size(1024).build();
    /// assert!(matches!(
    ///     ShardedCache::new(config),
    ///     Err(CacheError::ShardConfigurationInvalid { .. })
    /// ));
    /// ```
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        let shard_size = config.shard_size();
        if config.shard_count == 0 || shard_size < config.min_shard_size {
            return Err(CacheError::ShardConfigurationInvalid {
                shard_count: config.shard_count,
                shard_size,
                min: config.min_shard_size,
            });
        }

        let shards: Arc<[GuardedShard]> = (0..config.shard_count)
            .map(|_| GuardedShard::new(shard_size))
            .collect();

        info!(
            shards = config.shard_count,
            shard_size,
            total = shard_size * config.shard_count,
            "cache initialized"
        );

        Ok(Self { shards })
    }

    /// Index of the shard that owns `key`.
    ///
    /// Hashes the whole key, so it is defined for every key including the
    /// empty one, and stable for the lifetime of the cache.
    pub fn shard_of(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        hasher.write(key);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Byte budget of each shard, which is also the largest storable entry.
    pub fn shard_max_size(&self) -> usize {
        self.shards.first().map_or(0, GuardedShard::max_size)
    }

    /// Total number of entries across all shards.
    ///
    /// Shards are visited one at a time, so under concurrent writes this is
    /// not a single point-in-time value.
    pub fn len(&self) -> usize {
        self.shards.iter().map(GuardedShard::len).sum()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(GuardedShard::is_empty)
    }

    /// Total key + value bytes held across all shards.
    pub fn current_size(&self) -> usize {
        self.shards.iter().map(GuardedShard::current_size).sum()
    }

    /// Check if `key` is present without refreshing its recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.shard(key).contains(key)
    }

    /// Remove all entries from every shard.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    fn shard(&self, key: &[u8]) -> &GuardedShard {
        &self.shards[self.shard_of(key)]
    }
}

impl Storage for ShardedCache {
    fn put(&self, key: Bytes, value: Bytes) -> bool {
        self.shard(&key).put(key, value)
    }

    fn put_if_absent(&self, key: Bytes, value: Bytes) -> bool {
        self.shard(&key).put_if_absent(key, value)
    }

    fn set(&self, key: &[u8], value: Bytes) -> bool {
        self.shard(key).set(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.shard(key).delete(key)
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.shard(key).get(key)
    }

    fn stats(&self) -> StatsSnapshot {
        self.shards.iter().map(GuardedShard::stats).sum()
    }

    fn max_entry_size(&self) -> usize {
        self.shard_max_size()
    }
}
