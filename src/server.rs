//! TCP front end for a [`Storage`] backend.
//!
//! One Tokio task per connection. A connection reads into a buffer, executes
//! every complete request in arrival order, and writes the batched replies
//! before reading again. Cache calls are synchronous and short, so they run
//! directly on the runtime's worker threads.

use bytes::BytesMut;
use std::future::Future;
use std::sync::Arc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::error::CacheResult;
use crate::protocol::{self, Request, RequestParser};
use crate::storage::Storage;

/// Initial size of each connection's read and write buffers.
const BUFFER_SIZE: usize = 4096;

/// Accept connections until `shutdown` resolves.
///
/// On shutdown every open connection finishes the requests it has already
/// read, flushes their replies and closes. `serve` returns once all of them
/// are gone.
pub async fn serve<S, F>(listener: TcpListener, storage: Arc<S>, shutdown: F)
where
    S: Storage + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    // Dropping the sender tells every connection to close.
    let (closing_tx, closing_rx) = watch::channel(());
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        debug!(%addr, "connection accepted");

                        let storage = Arc::clone(&storage);
                        let closing = closing_rx.clone();
                        connections.spawn(async move {
                            match handle_connection(socket, storage, closing).await {
                                Ok(()) => debug!(%addr, "connection closed"),
                                Err(e) => warn!(%addr, error = %e, "connection error"),
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                    }
                }
            }
            // Reap finished connections so the set does not grow.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(closing_tx);
    if !connections.is_empty() {
        info!(open = connections.len(), "waiting for connections to close");
    }
    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "connection task failed");
        }
    }
}

/// Serve a single client connection until it closes, sends `quit`, or
/// `closing` reports that the server is shutting down.
pub async fn handle_connection<S: Storage>(
    mut socket: TcpStream,
    storage: Arc<S>,
    mut closing: watch::Receiver<()>,
) -> CacheResult<()> {
    let mut parser = RequestParser::new(storage.max_entry_size());
    let mut input = BytesMut::with_capacity(BUFFER_SIZE);
    let mut output = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        let quit = drain_requests(&mut parser, &mut input, &mut output, &*storage);

        if !output.is_empty() {
            socket.write_all(&output).await?;
            output.clear();
        }
        if quit {
            return Ok(());
        }

        let read = tokio::select! {
            read = socket.read_buf(&mut input) => read?,
            _ = closing.changed() => {
                debug!("closing connection for shutdown");
                return Ok(());
            }
        };

        if read == 0 {
            if !input.is_empty() {
                debug!(pending = input.len(), "peer closed mid-request");
            }
            return Ok(());
        }
    }
}

/// Execute every complete request in `input`. Returns `true` on `quit`.
fn drain_requests<S: Storage + ?Sized>(
    parser: &mut RequestParser,
    input: &mut BytesMut,
    output: &mut BytesMut,
    storage: &S,
) -> bool {
    loop {
        match parser.parse(input) {
            Ok(Some(Request::Quit)) => return true,
            Ok(Some(request)) => request.execute(storage, output),
            Ok(None) => return false,
            Err(err) => {
                debug!(error = %err, "rejected request");
                protocol::write_error(&err, output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guarded::GuardedShard;
    use bytes::Bytes;

    #[test]
    fn test_drain_stops_at_partial_request() {
        let shard = GuardedShard::new(1024);
        let mut input = BytesMut::from("set a 0 0 1\r\n1\r\nbogus\r\nget a\r\nset b 0 0 3\r\nxy");
        let mut output = BytesMut::new();

        let mut parser = RequestParser::new(1024);
        assert!(!drain_requests(&mut parser, &mut input, &mut output, &shard));
        assert_eq!(
            &output[..],
            &b"STORED\r\nERROR\r\nVALUE a 0 1\r\n1\r\nEND\r\n"[..]
        );
        assert_eq!(&input[..], b"set b 0 0 3\r\nxy");
    }

    #[test]
    fn test_drain_stops_at_quit() {
        let shard = GuardedShard::new(1024);
        let mut input = BytesMut::from("version\r\nquit\r\nget a\r\n");
        let mut output = BytesMut::new();

        let mut parser = RequestParser::new(1024);
        assert!(drain_requests(&mut parser, &mut input, &mut output, &shard));
        assert!(output.starts_with(b"VERSION "));
        assert_eq!(&input[..], b"get a\r\n");
    }

    #[test]
    fn test_overlong_line_split_across_reads_runs_nothing() {
        let shard = GuardedShard::new(1024);
        assert!(shard.put(Bytes::from("victim"), Bytes::from("v")));

        let mut parser = RequestParser::new(shard.max_entry_size());
        let mut input = BytesMut::from(format!("get {}", "a".repeat(2496)).as_str());
        let mut output = BytesMut::new();
        assert!(!drain_requests(&mut parser, &mut input, &mut output, &shard));

        input.extend_from_slice(b" delete victim\r\n");
        assert!(!drain_requests(&mut parser, &mut input, &mut output, &shard));

        assert_eq!(&output[..], &b"CLIENT_ERROR line too long\r\n"[..]);
        assert!(shard.contains(b"victim"));
    }

    #[test]
    fn test_oversized_store_answered_once() {
        let shard = GuardedShard::new(16);
        let mut parser = RequestParser::new(shard.max_entry_size());
        let mut input = BytesMut::from("set k 0 0 1099511627776\r\n");
        let mut output = BytesMut::new();

        assert!(!drain_requests(&mut parser, &mut input, &mut output, &shard));
        assert_eq!(
            &output[..],
            &b"SERVER_ERROR object too large for cache\r\n"[..]
        );
        assert!(input.is_empty());
    }
}
