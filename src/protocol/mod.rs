//! Wire Protocol Implementation
//!
//! Two request formats are supported; a server speaks exactly one of them,
//! chosen at startup:
//!
//! - [`Protocol::Line`]: `GET key\n` / `PUT key value\n`
//! - [`Protocol::Resp`]: Redis-style arrays of bulk strings, `GET`, `PUT`
//!   and `SET`
//!
//! ## Modules
//!
//! - `command`: The `Request` / `Reply` pair shared by both formats
//! - `line`: Line protocol codec
//! - `types`: The `RespValue` enum and bulk string encoding
//! - `parser`: Incremental parser for RESP request frames
//! - `resp`: RESP codec built on the parser
//!
//! ## Example
//!
//! ```
//! use kvcache::protocol::{Codec, Protocol, Reply, Request};
//! use bytes::{Bytes, BytesMut};
//!
//! let mut codec = Codec::new(Protocol::Resp, 64 * 1024);
//!
//! let mut input = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nabc\r\n"[..]);
//! let request = codec.decode(&mut input).unwrap().unwrap();
//! assert_eq!(request, Request::Get { key: Bytes::from("abc") });
//!
//! let mut output = BytesMut::new();
//! codec.encode(&Reply::NotFound, &mut output);
//! assert_eq!(&output[..], b"$-1\r\n");
//! ```

pub mod command;
pub mod line;
pub mod parser;
pub mod resp;
pub mod types;

use bytes::BytesMut;
use std::fmt;

// Re-export commonly used types for convenience
pub use command::{Reply, Request};
pub use line::LineCodec;
pub use parser::{Oversized, ParseError, ParseResult, Parsed, RespParser};
pub use resp::RespCodec;
pub use types::RespValue;

/// Which wire format a server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// Newline-terminated text commands
    #[default]
    Line,
    /// Redis Serialization Protocol subset
    Resp,
}

impl Protocol {
    /// Looks up a protocol by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("line") {
            Some(Protocol::Line)
        } else if name.eq_ignore_ascii_case("resp") {
            Some(Protocol::Resp)
        } else {
            None
        }
    }

    /// The name accepted by [`Protocol::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Line => "line",
            Protocol::Resp => "resp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The codec a connection uses, selected by [`Protocol`].
#[derive(Debug, Clone)]
pub enum Codec {
    /// Line protocol
    Line(LineCodec),
    /// RESP subset
    Resp(RespCodec),
}

impl Codec {
    /// Creates the codec for `protocol`.
    ///
    /// Requests longer than `max_frame_size` are skipped without being
    /// buffered and decode as [`Request::GetTooLong`] or
    /// [`Request::PutTooLong`].
    pub fn new(protocol: Protocol, max_frame_size: usize) -> Self {
        match protocol {
            Protocol::Line => Codec::Line(LineCodec::new(max_frame_size)),
            Protocol::Resp => Codec::Resp(RespCodec::new(max_frame_size)),
        }
    }

    /// Removes one complete request from the front of `buf`.
    ///
    /// - `Ok(Some(request))` - a whole frame was consumed
    /// - `Ok(None)` - more bytes are needed; `buf` is untouched unless an
    ///   oversized request is being skipped
    /// - `Err(e)` - framing is lost and the connection must close
    pub fn decode(&mut self, buf: &mut BytesMut) -> ParseResult<Option<Request>> {
        match self {
            Codec::Line(codec) => Ok(codec.decode(buf)),
            Codec::Resp(codec) => codec.decode(buf),
        }
    }

    /// Appends the wire form of `reply` to `dst`.
    pub fn encode(&self, reply: &Reply, dst: &mut BytesMut) {
        match self {
            Codec::Line(codec) => codec.encode(reply, dst),
            Codec::Resp(codec) => codec.encode(reply, dst),
        }
    }

    /// The protocol this codec speaks.
    pub fn protocol(&self) -> Protocol {
        match self {
            Codec::Line(_) => Protocol::Line,
            Codec::Resp(_) => Protocol::Resp,
        }
    }
}
