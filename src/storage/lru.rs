//! Bounded LRU Shard
//!
//! A single least-recently-used cache partition. Entries live in an arena of
//! slots addressed by index; each slot carries `prev`/`next` indices forming a
//! doubly linked recency list, and a key → slot map gives O(1) lookup.
//!
//! ```text
//!   index: HashMap<Bytes, usize>
//!        │
//!        ▼
//!   slots: [ s0 ][ s1 ][ s2 ][ s3 ] ...
//!
//!   head ──> s2 <──> s0 <──> s3 <──> s1 <── tail
//!          (MRU)                    (LRU, next victim)
//! ```
//!
//! Slots are never freed: the cache only shrinks through eviction, and an
//! eviction always happens on the insert that needs a slot, so the evicted
//! slot is reused in place for the new entry.
//!
//! The shard is not synchronized. [`ShardedCache`](super::ShardedCache) wraps
//! every shard in its own mutex.

use bytes::Bytes;
use std::collections::HashMap;

/// One arena slot: an entry plus its recency links.
#[derive(Debug)]
struct Slot {
    key: Bytes,
    value: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
}

/// What a [`LruShard::put`] did to the shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key already existed; its value was replaced and it became MRU.
    Updated,
    /// The key was new. `evicted` holds the key pushed out to make room.
    Inserted { evicted: Option<Bytes> },
}

/// A bounded LRU cache partition.
#[derive(Debug)]
pub struct LruShard {
    capacity: usize,
    index: HashMap<Bytes, usize>,
    slots: Vec<Slot>,
    /// Most recently used slot
    head: Option<usize>,
    /// Least recently used slot
    tail: Option<usize>,
}

impl LruShard {
    /// Creates an empty shard holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one; configuration validation rejects
    /// it before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &[u8]) -> Option<Bytes> {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        Some(self.slots[idx].value.clone())
    }

    /// Inserts or updates `key`.
    ///
    /// Updating keeps the entry count unchanged. Inserting into a full shard
    /// evicts exactly one entry, the current tail.
    pub fn put(&mut self, key: Bytes, value: Bytes) -> PutOutcome {
        if let Some(&idx) = self.index.get(&key[..]) {
            self.slots[idx].value = value;
            self.promote(idx);
            return PutOutcome::Updated;
        }

        match self.tail {
            Some(victim) if self.slots.len() >= self.capacity => {
                self.unlink(victim);
                let slot = &mut self.slots[victim];
                let evicted = std::mem::replace(&mut slot.key, key.clone());
                slot.value = value;
                self.index.remove(&evicted);
                self.index.insert(key, victim);
                self.push_front(victim);
                PutOutcome::Inserted {
                    evicted: Some(evicted),
                }
            }
            _ => {
                let idx = self.slots.len();
                self.slots.push(Slot {
                    key: key.clone(),
                    value,
                    prev: None,
                    next: None,
                });
                self.index.insert(key, idx);
                self.push_front(idx);
                PutOutcome::Inserted { evicted: None }
            }
        }
    }

    /// Returns true if `key` is resident. Does not affect recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    fn keys_by_recency(&self) -> Vec<Bytes> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            keys.push(self.slots[idx].key.clone());
            cursor = self.slots[idx].next;
        }
        keys
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries before eviction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Moves `idx` to the head of the recency list.
    #[inline]
    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = &self.slots[idx];
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        let slot = &mut self.slots[idx];
        slot.prev = None;
        slot.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = &mut self.slots[idx];
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => self.slots[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}
