//! Connection Module
//!
//! This module manages client connections to the cache server. Each client
//! is served by its own async task; a counting semaphore caps how many are
//! served at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Listener                                │
//! │       admission permit ──> accept() ──> socket options      │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ spawn task (permit moves in)
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Decode      │───>│ Execute     │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                     ┌─────────────┐    ┌─────────────┐      │
//! │                     │ Write+flush │<───│ Encode into │      │
//! │                     │             │    │ pooled buf  │      │
//! │                     └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Admission control**: `max_connections` permits, acquired before accept
//! - **Pipelining**: Several requests in one read get one batched write
//! - **Buffer pool**: Reply buffers are reused across connections
//! - **Statistics**: Tracks connection and command metrics
//!
//! ## Example
//!
//! ```ignore
//! use kvcache::config::Config;
//! use kvcache::connection::{ConnectionStats, Listener};
//! use kvcache::storage::ShardedCache;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let cache = Arc::new(ShardedCache::new(config.shard_count, config.capacity_per_shard)?);
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let tcp = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! Listener::new(tcp, config, cache, stats).run().await?;
//! ```

pub mod handler;
pub mod listener;
pub mod pool;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionSettings, ConnectionStats,
};
pub use listener::Listener;
pub use pool::{BufferPool, PooledBuffer};
