//! Command-line interface definitions.
//!
//! This module defines the CLI structure for the server and the client using
//! clap.

use clap::{Parser, Subcommand};

use crate::config::{CacheConfig, DEFAULT_MAX_SIZE, DEFAULT_SHARD_COUNT, MIN_SHARD_SIZE};

/// Default listen/connect host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen/connect port.
pub const DEFAULT_PORT: u16 = 11211;

/// Striped cache server.
///
/// Serves a memcached-style text protocol over TCP. Set `RUST_LOG` to adjust
/// logging, e.g. `RUST_LOG=striped_cache=debug`.
#[derive(Parser, Debug)]
#[command(name = "cache-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of independently locked shards.
    #[arg(short, long, default_value_t = DEFAULT_SHARD_COUNT)]
    pub shards: usize,

    /// Total key + value bytes the cache may hold.
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: usize,

    /// Reject configurations whose per-shard budget is below this.
    #[arg(long, default_value_t = MIN_SHARD_SIZE)]
    pub min_shard_size: usize,
}

impl ServerArgs {
    /// Cache configuration described by these arguments.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .shard_count(self.shards)
            .max_size(self.max_size)
            .min_shard_size(self.min_shard_size)
            .build()
    }

    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Striped cache client.
///
/// A CLI tool for interacting with the cache server.
#[derive(Parser, Debug)]
#[command(name = "cache-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server host.
    #[arg(long, global = true, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port.
    #[arg(short, long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The command to execute.
    #[command(subcommand)]
    pub command: ClientCommand,
}

/// Available client commands.
#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Get a value by key.
    Get {
        /// The key to look up.
        key: String,
    },

    /// Store a value, replacing any existing one.
    Set {
        /// The key to store the value under.
        key: String,
        /// The value to store.
        value: String,
    },

    /// Store a value only if the key does not exist yet.
    Add {
        /// The key to store the value under.
        key: String,
        /// The value to store.
        value: String,
    },

    /// Replace the value of an existing key.
    Replace {
        /// The key whose value to replace.
        key: String,
        /// The new value.
        value: String,
    },

    /// Delete a key.
    Delete {
        /// The key to delete.
        key: String,
    },

    /// Get server statistics.
    Stats,

    /// Get the server version.
    Version,
}

impl ClientCommand {
    /// Wire form of this command.
    pub fn to_request(&self) -> Vec<u8> {
        match self {
            ClientCommand::Get { key } => format!("get {}\r\n", key).into_bytes(),
            ClientCommand::Set { key, value } => store_request("set", key, value),
            ClientCommand::Add { key, value } => store_request("add", key, value),
            ClientCommand::Replace { key, value } => store_request("replace", key, value),
            ClientCommand::Delete { key } => format!("delete {}\r\n", key).into_bytes(),
            ClientCommand::Stats => b"stats\r\n".to_vec(),
            ClientCommand::Version => b"version\r\n".to_vec(),
        }
    }

    /// Whether the reply is a block terminated by `END`.
    pub fn expects_block(&self) -> bool {
        matches!(self, ClientCommand::Get { .. } | ClientCommand::Stats)
    }
}

fn store_request(verb: &str, key: &str, value: &str) -> Vec<u8> {
    format!("{} {} 0 0 {}\r\n{}\r\n", verb, key, value.len(), value).into_bytes()
}
