//! # Striped Cache
//!
//! An in-memory key/value cache with a fixed byte budget, least-recently-used
//! eviction and lock striping, plus a memcached-style TCP server in front of
//! it.
//!
//! ## Features
//!
//! - **Byte budget**: every entry costs `key.len() + value.len()` bytes; the
//!   budget is never exceeded once an operation returns
//! - **Strict LRU**: the least recently read or written entry is evicted first
//! - **Lock striping**: keys are hashed over independent shards, each with its
//!   own lock, so threads working on different shards never wait for each other
//! - **Statistics**: hits, misses, stores, evictions and occupancy, readable
//!   without taking any lock
//! - **Zero unsafe code**: the recency list is built on a slot arena
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use striped_cache::{CacheConfig, ShardedCache, Storage};
//!
//! let config = CacheConfig::new()
//!     .shard_count(4)
//!     .max_size(16 * 1024 * 1024)
//!     .build();
//!
//! let cache = ShardedCache::new(config)?;
//!
//! // Store and retrieve values
//! assert!(cache.put(Bytes::from("user:123"), Bytes::from("Alice")));
//!
//! if let Some(value) = cache.get(b"user:123") {
//!     println!("Found: {:?}", value);
//! }
//!
//! // Only insert when absent, only update when present
//! assert!(!cache.put_if_absent(Bytes::from("user:123"), Bytes::from("Bob")));
//! assert!(!cache.set(b"user:456", Bytes::from("Carol")));
//!
//! // Check statistics
//! let stats = cache.stats();
//! println!("Hit rate: {:.1}%", stats.hit_rate());
//! # Ok::<(), striped_cache::CacheError>(())
//! ```
//!
//! ## Thread Safety
//!
//! Cloning a `ShardedCache` creates a new handle to the same shards:
//!
//! ```rust
//! use bytes::Bytes;
//! use striped_cache::{CacheConfig, ShardedCache, Storage};
//! use std::thread;
//!
//! let cache = ShardedCache::new(CacheConfig::default())?;
//!
//! let handles: Vec<_> = (0..4).map(|i| {
//!     let cache = cache.clone();
//!     thread::spawn(move || {
//!         cache.put(Bytes::from(format!("key_{}", i)), Bytes::from(format!("value_{}", i)));
//!     })
//! }).collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(cache.len(), 4);
//! # Ok::<(), striped_cache::CacheError>(())
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod guarded;
pub mod protocol;
pub mod server;
pub mod shard;
pub mod stats;
pub mod storage;

pub use cache::ShardedCache;
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use guarded::GuardedShard;
pub use protocol::{Command, Request, RequestParser};
pub use shard::Shard;
pub use stats::{CacheStats, StatsSnapshot};
pub use storage::Storage;

// Internal modules - not part of public API
pub(crate) mod arena;
pub(crate) mod entry;
