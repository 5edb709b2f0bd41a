//! # kvcache - A Sharded In-Memory LRU Cache Server
//!
//! kvcache keeps a bounded set of byte-string keys and values in memory and
//! serves them over TCP. When a shard is full, its least recently used entry
//! is evicted.
//!
//! ## Features
//!
//! - **Two wire formats**: a newline-terminated line protocol, or a subset of
//!   RESP that stock Redis clients can speak (`GET`, `SET`/`PUT`)
//! - **Sharded LRU**: keys are spread over a power-of-two number of
//!   independently locked shards by FNV-1a hash
//! - **Admission control**: at most `max_connections` clients are served at
//!   once; the rest wait in the accept backlog
//! - **Async I/O**: Built on Tokio, one task per client
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              kvcache                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Listener   │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Semaphore) │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌─────────────┐   ┌──────────────────────────────┐  │
//! │  │ BufferPool  │<───│ Line / RESP │   │         ShardedCache         │  │
//! │  │             │    │   Codec     │   │ ┌───────┐ ┌───────┐ ┌──────┐ │  │
//! │  └─────────────┘    └─────────────┘   │ │LRU 0  │ │LRU 1  │ │...N  │ │  │
//! │                                       │ │Mutex  │ │Mutex  │ │      │ │  │
//! │                                       │ └───────┘ └───────┘ └──────┘ │  │
//! │                                       └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use kvcache::config::Config;
//! use kvcache::connection::{ConnectionStats, Listener};
//! use kvcache::storage::ShardedCache;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!
//!     // The cache is shared by every connection
//!     let cache = Arc::new(ShardedCache::new(
//!         config.shard_count,
//!         config.capacity_per_shard,
//!     )?);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let tcp = TcpListener::bind(config.bind_address()).await?;
//!     Listener::new(tcp, config, cache, stats).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocols
//!
//! ### Line
//! - `GET key\n` → `value\n` or `NOTFOUND\n`
//! - `PUT key value\n` → `OK\n` or `ERROR\n`
//!
//! ### RESP
//! - `*2 $3 GET $n key` → `$n value` or `$-1`
//! - `*3 $3 SET|PUT $n key $m value` → `+OK` or `-ERR key or value too long`
//!
//! ## Module Overview
//!
//! - [`config`]: Startup configuration and command-line parsing
//! - [`protocol`]: Line and RESP codecs
//! - [`storage`]: FNV-1a routing, LRU shards and the sharded cache
//! - [`commands`]: Request execution and size validation
//! - [`connection`]: Listener, per-client serving loop and buffer pool
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! Each shard is an independent `parking_lot::Mutex`. A request locks exactly
//! one shard and never holds the lock across I/O, so clients touching
//! different shards never wait on each other.
//!
//! ### Arena LRU
//!
//! Recency order lives in a slot vector linked by indices rather than
//! pointers. Eviction reuses the victim's slot, so a full shard allocates
//! nothing on insert beyond the key and value themselves.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{Config, ConfigError, DEFAULT_HOST, DEFAULT_PORT};
pub use connection::{handle_connection, BufferPool, ConnectionStats, Listener};
pub use protocol::{ParseError, Protocol, Reply, Request};
pub use storage::{CacheStats, ShardedCache};

/// Version of kvcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
