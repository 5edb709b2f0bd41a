//! Sharded LRU Cache
//!
//! The cache shared by every connection. Keys are routed to one of a fixed,
//! power-of-two number of [`LruShard`]s by FNV-1a hash and a bitmask, and each
//! shard sits behind its own mutex.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedCache                           │
//! │                                                             │
//! │        fnv1a_32(key) & (shard_count - 1)                    │
//! │                           │                                 │
//! │  ┌─────────┐ ┌─────────┐ ┌▼────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ Mutex   │           │
//! │  │ LruShard│ │ LruShard│ │ LruShard│ │ LruShard│           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A GET hit reorders the recency list, so reads take the same exclusive lock
//! as writes. Critical sections are map and list updates only; no I/O and no
//! `.await` ever happens with a shard locked.

use crate::config::ConfigError;
use crate::storage::hash::fnv1a_32;
use crate::storage::lru::{LruShard, PutOutcome};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Resident entries across all shards
    pub entries: u64,
    /// GETs that found their key
    pub hits: u64,
    /// GETs that did not
    pub misses: u64,
    /// PUTs that inserted a new key
    pub inserts: u64,
    /// PUTs that replaced an existing value
    pub updates: u64,
    /// Entries dropped to respect capacity
    pub evictions: u64,
}

/// A fixed array of independently locked LRU shards.
///
/// # Example
///
/// ```
/// use kvcache::storage::ShardedCache;
/// use bytes::Bytes;
///
/// let cache = ShardedCache::new(16, 1_000).unwrap();
/// cache.put(Bytes::from("name"), Bytes::from("kv"));
/// assert_eq!(cache.get(b"name"), Some(Bytes::from("kv")));
/// assert_eq!(cache.get(b"other"), None);
/// ```
pub struct ShardedCache {
    shards: Box<[Mutex<LruShard>]>,
    mask: usize,
    capacity_per_shard: usize,

    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for ShardedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shards", &self.shards.len())
            .field("capacity_per_shard", &self.capacity_per_shard)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl ShardedCache {
    /// Creates a cache of `shard_count` shards, each holding up to
    /// `capacity_per_shard` entries.
    ///
    /// `shard_count` must be a non-zero power of two and the capacity must be
    /// non-zero.
    pub fn new(shard_count: usize, capacity_per_shard: usize) -> Result<Self, ConfigError> {
        if !shard_count.is_power_of_two() {
            return Err(ConfigError::ShardCount(shard_count));
        }
        if capacity_per_shard == 0 {
            return Err(ConfigError::Zero("capacity per shard"));
        }

        let shards = (0..shard_count)
            .map(|_| Mutex::new(LruShard::new(capacity_per_shard)))
            .collect();

        Ok(Self {
            shards,
            mask: shard_count - 1,
            capacity_per_shard,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Index of the shard that owns `key`.
    #[inline]
    pub fn shard_index(&self, key: &[u8]) -> usize {
        fnv1a_32(key) as usize & self.mask
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Mutex<LruShard> {
        &self.shards[self.shard_index(key)]
    }

    /// Gets the value for `key`, marking it most recently used.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let value = self.shard(key).lock().get(key);

        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    /// Stores `value` under `key`, evicting the shard's least recently used
    /// entry if the shard is full.
    pub fn put(&self, key: Bytes, value: Bytes) {
        let outcome = self.shard(&key).lock().put(key, value);

        match outcome {
            PutOutcome::Updated => {
                self.updates.fetch_add(1, Ordering::Relaxed);
            }
            PutOutcome::Inserted { evicted } => {
                self.inserts.fetch_add(1, Ordering::Relaxed);
                if let Some(evicted) = evicted {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    trace!(key = ?evicted, "Evicted least recently used entry");
                }
            }
        }
    }

    /// Returns true if `key` is resident, without touching its recency.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.shard(key).lock().contains(key)
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Entries each shard holds before evicting.
    pub fn capacity_per_shard(&self) -> usize {
        self.capacity_per_shard
    }

    /// Total capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.capacity_per_shard * self.shards.len()
    }

    /// Entries resident in shard `index`, or `None` if out of range.
    pub fn shard_len(&self, index: usize) -> Option<usize> {
        self.shards.get(index).map(|shard| shard.lock().len())
    }

    /// Entries resident across all shards.
    ///
    /// Shards are locked one at a time, so under concurrent writes this is a
    /// point-in-time approximation.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Returns true if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
