//! Command Handler
//!
//! Executes decoded requests against the sharded cache.
//!
//! ## Supported Commands
//!
//! - `GET key` - Look up a key, refreshing its recency on a hit
//! - `PUT key value` - Insert or overwrite a key (`SET` over RESP)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  CommandHandler                  │
//! │                                                  │
//! │  Request ──> validate ──> execute ──> Reply      │
//! │                              │                   │
//! │                              ▼                   │
//! │                        ShardedCache              │
//! └──────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Reply, Request};
use crate::storage::ShardedCache;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Executes requests against a shared cache.
///
/// Cloning is cheap; every connection task holds its own handle.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The cache shared by all connections
    cache: Arc<ShardedCache>,
    /// Longest key or value a PUT may store
    max_key_value_len: usize,
}

impl CommandHandler {
    /// Creates a handler that rejects keys or values longer than
    /// `max_key_value_len` bytes.
    pub fn new(cache: Arc<ShardedCache>, max_key_value_len: usize) -> Self {
        Self {
            cache,
            max_key_value_len,
        }
    }

    /// Executes a request and returns the reply to send back.
    pub fn execute(&self, request: Request) -> Reply {
        match request {
            Request::Get { key } => self.cmd_get(&key),
            Request::Put { key, value } => self.cmd_put(key, value),
            // The frame limit exceeds any storable key, so the lookup would miss
            Request::GetTooLong => Reply::NotFound,
            Request::PutTooLong => {
                debug!(max = self.max_key_value_len, "Rejected PUT over the frame limit");
                Reply::TooLong
            }
            Request::Invalid => Reply::Invalid,
        }
    }

    /// The cache this handler executes against.
    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }

    /// GET key
    fn cmd_get(&self, key: &[u8]) -> Reply {
        match self.cache.get(key) {
            Some(value) => Reply::Value(value),
            None => Reply::NotFound,
        }
    }

    /// PUT key value
    fn cmd_put(&self, key: Bytes, value: Bytes) -> Reply {
        if key.len() > self.max_key_value_len || value.len() > self.max_key_value_len {
            debug!(
                key_len = key.len(),
                value_len = value.len(),
                max = self.max_key_value_len,
                "Rejected oversized PUT"
            );
            return Reply::TooLong;
        }

        self.cache.put(key, value);
        Reply::Stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let cache = Arc::new(ShardedCache::new(4, 2).unwrap());
        CommandHandler::new(cache, 8)
    }

    fn get(key: &str) -> Request {
        Request::Get {
            key: Bytes::from(key.to_string()),
        }
    }

    fn put(key: &str, value: &str) -> Request {
        Request::Put {
            key: Bytes::from(key.to_string()),
            value: Bytes::from(value.to_string()),
        }
    }

    #[test]
    fn test_put_get() {
        let handler = create_handler();

        assert_eq!(handler.execute(put("abc", "123")), Reply::Stored);
        assert_eq!(
            handler.execute(get("abc")),
            Reply::Value(Bytes::from("123"))
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(handler.execute(get("missing")), Reply::NotFound);
    }

    #[test]
    fn test_put_overwrites() {
        let handler = create_handler();

        handler.execute(put("abc", "1"));
        handler.execute(put("abc", "2"));
        assert_eq!(handler.execute(get("abc")), Reply::Value(Bytes::from("2")));
        assert_eq!(handler.cache().len(), 1);
    }

    #[test]
    fn test_empty_value_is_stored() {
        let handler = create_handler();

        assert_eq!(handler.execute(put("k", "")), Reply::Stored);
        assert_eq!(handler.execute(get("k")), Reply::Value(Bytes::new()));
    }

    #[test]
    fn test_size_limit() {
        let handler = create_handler();

        // Exactly at the limit is accepted
        assert_eq!(handler.execute(put("12345678", "12345678")), Reply::Stored);

        assert_eq!(handler.execute(put("123456789", "v")), Reply::TooLong);
        assert_eq!(handler.execute(put("k", "123456789")), Reply::TooLong);
        assert_eq!(handler.execute(get("123456789")), Reply::NotFound);
        assert_eq!(handler.execute(get("k")), Reply::NotFound);
        assert_eq!(handler.cache().len(), 1);
    }

    #[test]
    fn test_rejected_put_keeps_old_value() {
        let handler = create_handler();

        handler.execute(put("k", "old"));
        assert_eq!(handler.execute(put("k", "far too long")), Reply::TooLong);
        assert_eq!(handler.execute(get("k")), Reply::Value(Bytes::from("old")));
    }

    #[test]
    fn test_invalid() {
        let handler = create_handler();
        assert_eq!(handler.execute(Request::Invalid), Reply::Invalid);
        assert!(handler.cache().is_empty());
    }

    #[test]
    fn test_skipped_oversized_requests() {
        let handler = create_handler();

        handler.execute(put("k", "v"));
        assert_eq!(handler.execute(Request::PutTooLong), Reply::TooLong);
        assert_eq!(handler.execute(Request::GetTooLong), Reply::NotFound);
        assert_eq!(handler.execute(get("k")), Reply::Value(Bytes::from("v")));
        assert_eq!(handler.cache().len(), 1);
    }
}
