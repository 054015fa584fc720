//! Error types for the striped cache.
//!
//! Ordinary cache outcomes (entry too large, key missing, key already
//! present) are not errors: the storage operations report them as `false` or
//! `None`. This module covers the failures that abort something larger: a
//! cache that cannot be constructed, or a client request that cannot be
//! understood.

use std::io;

use thiserror::Error;

/// The main error type for the cache and its server.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The configuration would produce shards that cannot hold a meaningful
    /// entry (or no shards at all). The cache is never created.
    #[error(
        "invalid shard configuration: {shard_count} shard(s) of {shard_size} bytes (min: {min})"
    )]
    ShardConfigurationInvalid {
        shard_count: usize,
        shard_size: usize,
        min: usize,
    },

    /// The command verb was not recognised.
    #[error("invalid command: '{0}'")]
    InvalidCommand(String),

    /// The request line or its data block was malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A store announced a data block larger than any shard could hold.
    #[error("object too large for cache")]
    ObjectTooLarge { len: usize, max: usize },

    /// An I/O error occurred on a connection or listener.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A specialized Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::InvalidCommand("foo".to_string());
        assert_eq!(format!("{}", err), "invalid command: 'foo'");

        let err = CacheError::ShardConfigurationInvalid {
            shard_count: 4,
            shard_size: 512,
            min: 1024,
        };
        assert_eq!(
            format!("{}", err),
            "invalid shard configuration: 4 shard(s) of 512 bytes (min: 1024)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
        assert!(std::error::Error::source(&cache_err).is_some());
    }
}
