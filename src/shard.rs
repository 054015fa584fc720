//! Single-threaded, byte-budgeted LRU store.
//!
//! A [`Shard`] keeps its entries in a slot arena and threads them into a
//! doubly-linked recency list through slot ids: the head is the most recently
//! used entry, the tail the least. A hash index maps each key to its slot so
//! lookups, relocation to the head and removal are all O(1).
//!
//! The shard never lets `current_size` exceed `max_size` at the end of an
//! operation. Anything larger than the whole budget is refused up front, which
//! is what guarantees the eviction loop terminates: evicting every other entry
//! always makes room.
//!
//! `Shard` does no locking of its own; see [`GuardedShard`](crate::GuardedShard).

use bytes::Bytes;
use std::collections::HashMap;
use tracing::trace;

use crate::arena::{SlotArena, SlotId};
use crate::entry::{entry_size, Entry};

/// An LRU store bounded by total key + value bytes.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use striped_cache::Shard;
///
/// let mut shard = Shard::new(16);
/// assert!(shard.put(Bytes::from("a"), Bytes::from("1234567")));
/// assert!(shard.put(Bytes::from("b"), Bytes::from("1234567")));
///
/// // Touch "a" so that "b" becomes the eviction candidate.
/// assert!(shard.get(b"a").is_some());
/// assert!(shard.put(Bytes::from("c"), Bytes::from("1234567")));
///
/// assert!(shard.get(b"b").is_none());
/// assert!(shard.get(b"a").is_some());
/// ```
#[derive(Debug)]
pub struct Shard {
    /// Owns every entry.
    entries: SlotArena<Entry>,

    /// Key to slot. Holds exactly the keys on the recency list.
    index: HashMap<Bytes, SlotId>,

    /// Most recently used.
    head: Option<SlotId>,

    /// Least recently used; next to be evicted.
    tail: Option<SlotId>,

    /// Sum of `entry.size()` over all entries.
    current_size: usize,

    max_size: usize,

    /// Entries dropped to make room, over the shard's lifetime.
    evictions: u64,
}

impl Shard {
    /// Create an empty shard with the given byte budget.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: SlotArena::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            current_size: 0,
            max_size,
            evictions: 0,
        }
    }

    /// Insert or update `key`.
    ///
    /// Returns `false` without touching anything if the pair alone is larger
    /// than the budget. Otherwise the entry ends up at the head and
    /// least-recently-used entries are evicted until the budget holds.
    pub fn put(&mut self, key: Bytes, value: Bytes) -> bool {
        if !self.admits(&key, &value) {
            return false;
        }

        match self.index.get(key.as_ref()).copied() {
            Some(id) => self.update(id, value),
            None => self.insert(key, value),
        }
        true
    }

    /// Insert `key` only if it is not already present.
    ///
    /// Returns `false` without touching anything if the key exists or the pair
    /// is larger than the budget. An existing entry keeps its value and its
    /// place in the recency order.
    pub fn put_if_absent(&mut self, key: Bytes, value: Bytes) -> bool {
        if !self.admits(&key, &value) {
            return false;
        }

        if self.index.contains_key(key.as_ref()) {
            trace!(key = ?key, "put_if_absent: key already present");
            return false;
        }

        self.insert(key, value);
        true
    }

    /// Replace the value of an existing key.
    ///
    /// Returns `false` without touching anything if the key is absent or the
    /// pair is larger than the budget. Never creates a key.
    pub fn set(&mut self, key: &[u8], value: Bytes) -> bool {
        if !self.admits(key, &value) {
            return false;
        }

        match self.index.get(key).copied() {
            Some(id) => {
                self.update(id, value);
                true
            }
            None => {
                trace!(key = ?Bytes::copy_from_slice(key), "set: key not found");
                false
            }
        }
    }

    /// Remove `key`. Returns whether anything was removed.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        match self.index.get(key).copied() {
            Some(id) => self.remove(id).is_some(),
            None => false,
        }
    }

    /// Look up `key`, making it the most recently used entry on a hit.
    pub fn get(&mut self, key: &[u8]) -> Option<Bytes> {
        let id = self.index.get(key).copied()?;
        self.move_to_front(id);
        self.entries.get(id).map(|entry| entry.value.clone())
    }

    /// Check for `key` without refreshing its recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently charged against the budget.
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// The byte budget.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Total entries evicted to make room since the shard was created.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Remove every entry. Does not count as eviction.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.current_size = 0;
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &Bytes> + '_ {
        let first = self.head.and_then(|id| self.entries.get(id));
        std::iter::successors(first, move |entry| {
            entry.less_recent.and_then(|id| self.entries.get(id))
        })
        .map(|entry| &entry.key)
    }

    // Private helper methods

    /// Admission check: a pair larger than the whole budget is never stored.
    fn admits(&self, key: &[u8], value: &[u8]) -> bool {
        let size = entry_size(key, value);
        if size > self.max_size {
            trace!(size, max_size = self.max_size, "entry exceeds shard budget");
            return false;
        }
        true
    }

    fn insert(&mut self, key: Bytes, value: Bytes) {
        let size = entry_size(&key, &value);
        self.evict_until_fits(size, None);

        let id = self.entries.insert(Entry::new(key.clone(), value));
        self.push_front(id);
        self.index.insert(key, id);
        self.current_size += size;
    }

    fn update(&mut self, id: SlotId, value: Bytes) {
        self.move_to_front(id);

        if let Some(entry) = self.entries.get_mut(id) {
            self.current_size = self.current_size - entry.value.len() + value.len();
            entry.value = value;
        }

        self.evict_until_fits(0, Some(id));
    }

    /// Evict from the tail until `incoming` more bytes fit. `keep` is the
    /// entry being updated; it sits at the head and is never a candidate.
    fn evict_until_fits(&mut self, incoming: usize, keep: Option<SlotId>) {
        while self.current_size + incoming > self.max_size {
            let tail = match self.tail {
                Some(tail) if Some(tail) != keep => tail,
                _ => break,
            };

            if let Some(entry) = self.remove(tail) {
                self.evictions += 1;
                trace!(key = ?entry.key, size = entry.size(), "evicted");
            }
        }
    }

    /// Unlink an entry and drop it from the arena and the index.
    fn remove(&mut self, id: SlotId) -> Option<Entry> {
        self.unlink(id);
        let entry = self.entries.remove(id)?;
        self.index.remove(entry.key.as_ref());
        self.current_size -= entry.size();
        Some(entry)
    }

    fn move_to_front(&mut self, id: SlotId) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(id);
        self.push_front(id);
    }

    fn push_front(&mut self, id: SlotId) {
        let old_head = self.head;

        if let Some(entry) = self.entries.get_mut(id) {
            entry.more_recent = None;
            entry.less_recent = old_head;
        }

        match old_head.and_then(|head| self.entries.get_mut(head)) {
            Some(head) => head.more_recent = Some(id),
            None => self.tail = Some(id),
        }

        self.head = Some(id);
    }

    /// Detach an entry from its neighbours, fixing up head and tail.
    fn unlink(&mut self, id: SlotId) {
        let (more_recent, less_recent) = match self.entries.get_mut(id) {
            Some(entry) => (entry.more_recent.take(), entry.less_recent.take()),
            None => return,
        };

        match more_recent.and_then(|prev| self.entries.get_mut(prev)) {
            Some(prev) => prev.less_recent = less_recent,
            None => self.head = less_recent,
        }

        match less_recent.and_then(|next| self.entries.get_mut(next)) {
            Some(next) => next.more_recent = more_recent,
            None => self.tail = more_recent,
        }
    }

    /// Walk the list and cross-check it against the index and the size counter.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = 0;
        let mut total = 0;
        let mut prev: Option<SlotId> = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let entry = self.entries.get(id).expect("linked slot must be occupied");
            assert_eq!(entry.more_recent, prev, "broken back link");
            assert_eq!(self.index.get(entry.key.as_ref()), Some(&id), "index out of sync");
            seen += 1;
            total += entry.size();
            prev = Some(id);
            cursor = entry.less_recent;
        }

        assert_eq!(self.tail, prev, "tail does not end the list");
        assert_eq!(self.head.is_none(), self.tail.is_none());
        assert_eq!(seen, self.index.len(), "index has untracked keys");
        assert_eq!(seen, self.entries.len(), "arena has unlinked entries");
        assert_eq!(total, self.current_size, "size counter drifted");
        assert!(self.current_size <= self.max_size, "budget exceeded");
    }
}
