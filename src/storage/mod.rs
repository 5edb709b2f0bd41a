//! Storage Engine Module
//!
//! The bounded, sharded LRU cache that backs the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ShardedCache                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...16    │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **FNV-1a Routing**: `hash & (shards - 1)` picks the shard
//! - **Strict LRU per Shard**: every hit and every write refreshes recency
//! - **Bounded**: each shard evicts its least recently used entry when full
//!
//! ## Example
//!
//! ```
//! use kvcache::storage::ShardedCache;
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ShardedCache::new(16, 20_000).unwrap());
//!
//! cache.put(Bytes::from("name"), Bytes::from("kv"));
//! assert_eq!(cache.get(b"name"), Some(Bytes::from("kv")));
//! ```

pub mod hash;
pub mod lru;
pub mod sharded;

// Re-export commonly used types
pub use hash::fnv1a_32;
pub use lru::{LruShard, PutOutcome};
pub use sharded::{CacheStats, ShardedCache};
