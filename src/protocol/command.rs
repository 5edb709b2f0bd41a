//! Decoded requests and the replies sent back for them.
//!
//! Both wire formats decode into the same [`Request`] and encode the same
//! [`Reply`], so the command handler never sees protocol details.

use crate::protocol::types::RespValue;
use bytes::Bytes;

/// A single client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up `key`
    Get { key: Bytes },
    /// Store `value` under `key`
    Put { key: Bytes, value: Bytes },
    /// A GET whose frame crossed the frame limit and was skipped unread
    GetTooLong,
    /// A PUT whose frame crossed the frame limit and was skipped unread
    PutTooLong,
    /// A complete frame that is not a GET or PUT
    Invalid,
}

/// The outcome of executing a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// GET hit
    Value(Bytes),
    /// GET miss
    NotFound,
    /// PUT accepted
    Stored,
    /// PUT rejected because the key or value exceeds the size limit
    TooLong,
    /// Unknown command or wrong argument shape
    Invalid,
}

impl Request {
    /// Maps a parsed RESP frame to a request.
    ///
    /// `*2` with `GET` is a lookup, `*3` with `PUT` or `SET` is a store.
    /// Command names are matched exactly. Every other frame, including ones
    /// carrying null bulk strings, is [`Request::Invalid`].
    pub fn from_resp(frame: RespValue) -> Self {
        let mut args = match frame {
            RespValue::Array(args) => args.into_iter(),
            _ => return Request::Invalid,
        };

        let name = match args.next() {
            Some(RespValue::BulkString(name)) => name,
            _ => return Request::Invalid,
        };

        match (&name[..], args.next(), args.next(), args.next()) {
            (b"GET", Some(RespValue::BulkString(key)), None, None) => Request::Get { key },
            (
                b"PUT" | b"SET",
                Some(RespValue::BulkString(key)),
                Some(RespValue::BulkString(value)),
                None,
            ) => Request::Put { key, value },
            _ => Request::Invalid,
        }
    }

    /// Maps a RESP frame that crossed the frame limit to a request.
    ///
    /// `parsed` holds the elements that arrived before the one crossing the
    /// limit and `argc` is the element count from the array header. The
    /// crossing element is a bulk string whose payload was never buffered.
    pub fn from_oversized_resp(parsed: &[RespValue], argc: usize) -> Self {
        if parsed.iter().any(|arg| matches!(arg, RespValue::Null)) {
            return Request::Invalid;
        }

        match (parsed.first(), argc) {
            (Some(RespValue::BulkString(name)), 2) if &name[..] == b"GET" => Request::GetTooLong,
            (Some(RespValue::BulkString(name)), 3) if matches!(&name[..], b"PUT" | b"SET") => {
                Request::PutTooLong
            }
            _ => Request::Invalid,
        }
    }
}
