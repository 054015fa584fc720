//! Text protocol for the cache server.
//!
//! A memcached-style line protocol. Requests are parsed incrementally out of a
//! connection's read buffer; a request whose data block has not fully arrived
//! is left in the buffer untouched.
//!
//! ```text
//! set <key> <flags> <exptime> <bytes> [noreply]\r\n<data>\r\n   -> STORED | NOT_STORED
//! add <key> <flags> <exptime> <bytes> [noreply]\r\n<data>\r\n   -> STORED | NOT_STORED
//! replace <key> <flags> <exptime> <bytes> [noreply]\r\n<data>\r\n
//! get <key> [<key> ...]\r\n          -> (VALUE <key> 0 <bytes>\r\n<data>\r\n)* END
//! delete <key> [noreply]\r\n         -> DELETED | NOT_FOUND
//! stats\r\n                          -> (STAT <name> <value>\r\n)* END
//! version\r\n                        -> VERSION <version>
//! quit\r\n
//! ```
//!
//! `flags` and `exptime` are validated but not kept: entries leave the cache
//! only through `delete` or LRU eviction.
//!
//! A store announcing more data than the backend could ever hold is answered
//! `SERVER_ERROR object too large for cache` and its data block is skipped
//! without being buffered. A line longer than [`MAX_LINE_LEN`] is answered
//! `CLIENT_ERROR line too long` and skipped through its terminator.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt::Write as _;

use crate::error::{CacheError, CacheResult};
use crate::storage::Storage;

/// Longest request line accepted, terminator excluded.
pub const MAX_LINE_LEN: usize = 2048;

/// Types of commands supported by the cache server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Insert or overwrite (`put`).
    Set,
    /// Insert only if absent (`put_if_absent`).
    Add,
    /// Overwrite only if present (`set`).
    Replace,
    /// Fetch one or more keys.
    Get,
    /// Remove a key.
    Delete,
    /// Report server statistics.
    Stats,
    /// Report the server version.
    Version,
    /// Close the connection.
    Quit,
}

impl Command {
    /// Parse a command verb (case-insensitive).
    pub fn parse(verb: &[u8]) -> CacheResult<Command> {
        match verb.to_ascii_lowercase().as_slice() {
            b"set" => Ok(Command::Set),
            b"add" => Ok(Command::Add),
            b"replace" => Ok(Command::Replace),
            b"get" => Ok(Command::Get),
            b"delete" => Ok(Command::Delete),
            b"stats" => Ok(Command::Stats),
            b"version" => Ok(Command::Version),
            b"quit" => Ok(Command::Quit),
            _ => Err(CacheError::InvalidCommand(
                String::from_utf8_lossy(verb).into_owned(),
            )),
        }
    }

    /// Get the string representation of this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Set => "set",
            Command::Add => "add",
            Command::Replace => "replace",
            Command::Get => "get",
            Command::Delete => "delete",
            Command::Stats => "stats",
            Command::Version => "version",
            Command::Quit => "quit",
        }
    }

    fn is_storage(&self) -> bool {
        matches!(self, Command::Set | Command::Add | Command::Replace)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `set`, `add` or `replace`.
    Store {
        command: Command,
        key: Bytes,
        value: Bytes,
        noreply: bool,
    },
    Get {
        keys: Vec<Bytes>,
    },
    Delete {
        key: Bytes,
        noreply: bool,
    },
    Stats,
    Version,
    Quit,
}

/// What the request line announced, before any data block is read.
enum Header {
    Store {
        command: Command,
        key: Bytes,
        len: usize,
        noreply: bool,
    },
    Complete(Request),
}

/// Input the parser has decided to throw away without replying to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    Nothing,
    /// The rest of an overlong line, through its `\n`.
    Line,
    /// The data block of a refused store, `\r\n` included.
    Bytes(usize),
}

/// Incremental request parser for one connection.
///
/// Requests are cut out of the connection's read buffer as they complete.
/// The parser remembers input it is discarding, so an overlong line or the
/// data block of an oversized store is dropped the same way no matter how
/// the bytes are split across reads.
#[derive(Debug)]
pub struct RequestParser {
    /// Largest data block a store may announce.
    max_value_len: usize,
    discard: Discard,
}

impl RequestParser {
    /// Create a parser that refuses data blocks longer than `max_value_len`.
    pub fn new(max_value_len: usize) -> Self {
        Self {
            max_value_len,
            discard: Discard::Nothing,
        }
    }

    /// Parse the next request out of `buf`.
    ///
    /// Returns `Ok(None)` when more input is needed; a partial request is left
    /// in `buf` untouched. A malformed request is consumed before its error is
    /// returned, so the caller can reply and carry on with whatever follows.
    pub fn parse(&mut self, buf: &mut BytesMut) -> CacheResult<Option<Request>> {
        if !self.skip_discarded(buf) {
            return Ok(None);
        }

        let newline = match buf.iter().position(|b| *b == b'\n') {
            Some(pos) => pos,
            None if buf.len() > MAX_LINE_LEN => {
                buf.clear();
                self.discard = Discard::Line;
                return Err(CacheError::ParseError("line too long".to_string()));
            }
            None => return Ok(None),
        };
        let header_len = newline + 1;

        let header = match parse_header(&buf[..newline]) {
            Ok(header) => header,
            Err(err) => {
                buf.advance(header_len);
                return Err(err);
            }
        };

        match header {
            Header::Complete(request) => {
                buf.advance(header_len);
                Ok(Some(request))
            }
            Header::Store {
                command,
                key,
                len,
                noreply,
            } => {
                if len > self.max_value_len {
                    buf.advance(header_len);
                    self.discard = Discard::Bytes(len.saturating_add(2));
                    return Err(CacheError::ObjectTooLarge {
                        len,
                        max: self.max_value_len,
                    });
                }

                let frame_len = match header_len.checked_add(len).and_then(|n| n.checked_add(2)) {
                    Some(frame_len) => frame_len,
                    None => {
                        buf.advance(header_len);
                        return Err(CacheError::ParseError("bad bytes value".to_string()));
                    }
                };
                if buf.len() < frame_len {
                    return Ok(None);
                }

                if &buf[header_len + len..frame_len] != b"\r\n" {
                    buf.advance(frame_len);
                    return Err(CacheError::ParseError("bad data chunk".to_string()));
                }

                buf.advance(header_len);
                let value = buf.split_to(len).freeze();
                buf.advance(2);

                Ok(Some(Request::Store {
                    command,
                    key,
                    value,
                    noreply,
                }))
            }
        }
    }

    /// Drop whatever is being discarded from the front of `buf`. Returns
    /// `false` while there is more to discard than `buf` holds.
    fn skip_discarded(&mut self, buf: &mut BytesMut) -> bool {
        match self.discard {
            Discard::Nothing => true,
            Discard::Line => match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    buf.advance(pos + 1);
                    self.discard = Discard::Nothing;
                    true
                }
                None => {
                    buf.clear();
                    false
                }
            },
            Discard::Bytes(remaining) => {
                let n = remaining.min(buf.len());
                buf.advance(n);
                if n < remaining {
                    self.discard = Discard::Bytes(remaining - n);
                    false
                } else {
                    self.discard = Discard::Nothing;
                    true
                }
            }
        }
    }
}

fn parse_header(line: &[u8]) -> CacheResult<Header> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.len() > MAX_LINE_LEN {
        return Err(CacheError::ParseError("line too long".to_string()));
    }

    let tokens: Vec<&[u8]> = line
        .split(|b| *b == b' ')
        .filter(|token| !token.is_empty())
        .collect();

    let (verb, args) = match tokens.split_first() {
        Some((verb, args)) => (*verb, args),
        None => return Err(CacheError::InvalidCommand(String::new())),
    };

    let command = Command::parse(verb)?;

    if command.is_storage() {
        let (key, flags, exptime, len, noreply) = match args {
            [key, flags, exptime, len] => (key, flags, exptime, len, false),
            [key, flags, exptime, len, last] => (key, flags, exptime, len, parse_noreply(last)?),
            _ => return Err(bad_format(command)),
        };
        parse_number::<u32>(flags, "flags")?;
        parse_number::<i64>(exptime, "exptime")?;

        return Ok(Header::Store {
            command,
            key: Bytes::copy_from_slice(key),
            len: parse_number(len, "bytes")?,
            noreply,
        });
    }

    let request = match (command, args) {
        (Command::Get, [_, ..]) => Request::Get {
            keys: args.iter().map(|key| Bytes::copy_from_slice(key)).collect(),
        },
        (Command::Delete, [key]) => Request::Delete {
            key: Bytes::copy_from_slice(key),
            noreply: false,
        },
        (Command::Delete, [key, last]) => Request::Delete {
            key: Bytes::copy_from_slice(key),
            noreply: parse_noreply(last)?,
        },
        (Command::Stats, _) => Request::Stats,
        (Command::Version, []) => Request::Version,
        (Command::Quit, []) => Request::Quit,
        _ => return Err(bad_format(command)),
    };
    Ok(Header::Complete(request))
}

fn parse_number<T: std::str::FromStr>(token: &[u8], what: &str) -> CacheResult<T> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CacheError::ParseError(format!("bad {} value", what)))
}

fn parse_noreply(token: &[u8]) -> CacheResult<bool> {
    if token == b"noreply" {
        Ok(true)
    } else {
        Err(CacheError::ParseError("bad command line format".to_string()))
    }
}

fn bad_format(command: Command) -> CacheError {
    CacheError::ParseError(format!("bad command line format for '{}'", command))
}

impl Request {
    /// Run the request against `storage`, appending the reply to `out`.
    ///
    /// `Quit` writes nothing; closing the connection is up to the caller.
    pub fn execute<S: Storage + ?Sized>(self, storage: &S, out: &mut BytesMut) {
        match self {
            Request::Store {
                command,
                key,
                value,
                noreply,
            } => {
                let stored = match command {
                    Command::Add => storage.put_if_absent(key, value),
                    Command::Replace => storage.set(&key, value),
                    _ => storage.put(key, value),
                };
                if !noreply {
                    let reply: &[u8] = if stored { b"STORED\r\n" } else { b"NOT_STORED\r\n" };
                    out.put_slice(reply);
                }
            }

            Request::Get { keys } => {
                for key in keys {
                    if let Some(value) = storage.get(&key) {
                        out.put_slice(b"VALUE ");
                        out.put_slice(&key);
                        let _ = write!(out, " 0 {}\r\n", value.len());
                        out.put_slice(&value);
                        out.put_slice(b"\r\n");
                    }
                }
                out.put_slice(b"END\r\n");
            }

            Request::Delete { key, noreply } => {
                let deleted = storage.delete(&key);
                if !noreply {
                    let reply: &[u8] = if deleted { b"DELETED\r\n" } else { b"NOT_FOUND\r\n" };
                    out.put_slice(reply);
                }
            }

            Request::Stats => {
                let stats = storage.stats();
                let _ = write!(
                    out,
                    "STAT get_hits {}\r\n\
                     STAT get_misses {}\r\n\
                     STAT hit_rate {:.1}\r\n\
                     STAT stores {}\r\n\
                     STAT store_rejected {}\r\n\
                     STAT delete_hits {}\r\n\
                     STAT evictions {}\r\n\
                     STAT curr_items {}\r\n\
                     STAT bytes {}\r\n\
                     END\r\n",
                    stats.hits,
                    stats.misses,
                    stats.hit_rate(),
                    stats.stores,
                    stats.rejected,
                    stats.deletes,
                    stats.evictions,
                    stats.entries,
                    stats.bytes,
                );
            }

            Request::Version => {
                let _ = write!(out, "VERSION {}\r\n", env!("CARGO_PKG_VERSION"));
            }

            Request::Quit => {}
        }
    }
}

/// Append the reply for a request that could not be parsed.
pub fn write_error(err: &CacheError, out: &mut BytesMut) {
    let _ = match err {
        CacheError::InvalidCommand(_) => write!(out, "ERROR\r\n"),
        CacheError::ParseError(msg) => write!(out, "CLIENT_ERROR {}\r\n", msg),
        other => write!(out, "SERVER_ERROR {}\r\n", other),
    };
}
