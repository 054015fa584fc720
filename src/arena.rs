//! Slot storage for shard entries.
//!
//! Entries live in a `Vec` of optional slots and are addressed by [`SlotId`].
//! A removed slot goes on a free list and is handed out again by the next
//! insert, so ids stay stable for as long as the entry they name is alive.

/// Stable handle to an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(usize);

#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx] = Some(value);
                idx
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        self.len += 1;
        SlotId(idx)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let value = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.len = 0;
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
