//! Configuration for the striped cache.
//!
//! This module provides a builder for the construction-time parameters of a
//! [`ShardedCache`](crate::ShardedCache): how many shards to stripe the
//! keyspace over, the aggregate byte budget, and the smallest per-shard
//! budget considered viable. None of these are re-read after construction.

/// Default number of shards.
pub const DEFAULT_SHARD_COUNT: usize = 2;

/// Default aggregate byte budget (2 MiB).
pub const DEFAULT_MAX_SIZE: usize = 2 * 1024 * 1024;

/// Smallest per-shard budget accepted by default (1 MiB).
pub const MIN_SHARD_SIZE: usize = 1024 * 1024;

/// Configuration for creating a new cache instance.
///
/// Use the builder pattern to construct configuration:
///
/// ```
/// use striped_cache::CacheConfig;
///
/// let config = CacheConfig::new()
///     .shard_count(8)
///     .max_size(64 * 1024 * 1024)
///     .build();
///
/// assert_eq!(config.shard_size(), 8 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of independent shards (stripes). Each has its own lock.
    pub(crate) shard_count: usize,

    /// Aggregate byte budget, split evenly across the shards.
    /// An entry costs `key.len() + value.len()` bytes.
    pub(crate) max_size: usize,

    /// Per-shard budgets below this are rejected at construction.
    pub(crate) min_shard_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            max_size: DEFAULT_MAX_SIZE,
            min_shard_size: MIN_SHARD_SIZE,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of shards.
    ///
    /// More shards mean less lock contention, but each shard gets a smaller
    /// slice of the byte budget and evicts independently.
    pub fn shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Set the aggregate byte budget.
    pub fn max_size(mut self, bytes: usize) -> Self {
        self.max_size = bytes;
        self
    }

    /// Set the smallest per-shard budget accepted at construction.
    pub fn min_shard_size(mut self, bytes: usize) -> Self {
        self.min_shard_size = bytes;
        self
    }

    /// Build the final configuration.
    ///
    /// Validation happens when the cache is constructed, see
    /// [`ShardedCache::new`](crate::ShardedCache::new).
    pub fn build(self) -> Self {
        self
    }

    /// Get the configured shard count.
    pub fn get_shard_count(&self) -> usize {
        self.shard_count
    }

    /// Get the aggregate byte budget.
    pub fn get_max_size(&self) -> usize {
        self.max_size
    }

    /// Get the minimum viable per-shard budget.
    pub fn get_min_shard_size(&self) -> usize {
        self.min_shard_size
    }

    /// Byte budget each shard receives. Zero when `shard_count` is zero.
    pub fn shard_size(&self) -> usize {
        self.max_size.checked_div(self.shard_count).unwrap_or(0)
    }
}
