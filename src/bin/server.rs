//! Striped cache server.
//!
//! This binary runs a TCP server that accepts memcached-style text commands.

use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use striped_cache::{cli::ServerArgs, server, ShardedCache, Storage};

/// Entry point for the cache server.
#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "striped_cache=info,server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();

    let cache = match ShardedCache::new(args.cache_config()) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!(error = %e, "refusing to start");
            return Err(e.into());
        }
    };

    let addr = args.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        %addr,
        shards = cache.shard_count(),
        shard_size = cache.shard_max_size(),
        "cache server listening"
    );

    server::serve(listener, Arc::clone(&cache), shutdown_signal()).await;

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entries,
        bytes = stats.bytes,
        evictions = stats.evictions,
        "final stats"
    );

    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
