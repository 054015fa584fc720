//! Cache entry with its recency links.

use bytes::Bytes;

use crate::arena::SlotId;

/// A single key/value record plus its position in the recency list.
///
/// The links are slot ids, not owning pointers: the shard's arena owns every
/// entry, and `more_recent`/`less_recent` only name neighbours.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The key, shared with the shard's index.
    pub(crate) key: Bytes,

    /// The stored value.
    pub(crate) value: Bytes,

    /// Neighbour toward the head (most recently used). `None` at the head.
    pub(crate) more_recent: Option<SlotId>,

    /// Neighbour toward the tail (least recently used). `None` at the tail.
    pub(crate) less_recent: Option<SlotId>,
}

impl Entry {
    /// Create an unlinked entry.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self {
            key,
            value,
            more_recent: None,
            less_recent: None,
        }
    }

    /// Bytes this entry counts against the shard budget.
    pub fn size(&self) -> usize {
        entry_size(&self.key, &self.value)
    }
}

/// Budget cost of a key/value pair.
pub(crate) fn entry_size(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len()
}
