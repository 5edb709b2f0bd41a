//! Line Protocol
//!
//! A plain-text protocol with one request per `\n`-terminated line:
//!
//! ```text
//! GET <key>\n            ->  <value>\n  |  NOTFOUND\n
//! PUT <key> <value>\n    ->  OK\n       |  ERROR\n
//! ```
//!
//! `\n` is the only terminator. A `\r` before it is part of the key or value.
//!
//! After the three-letter command any run of spaces is skipped. For PUT the
//! rest of the line is split on its first space: the key is before it and the
//! value is everything after, spaces included.
//!
//! A line that reaches the frame limit without a `\n` is not buffered
//! further. Its bytes are dropped up to the next `\n` and it is answered as
//! a request too long to serve.

use crate::protocol::command::{Reply, Request};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

const NOT_FOUND: &[u8] = b"NOTFOUND\n";
const OK: &[u8] = b"OK\n";
const ERROR: &[u8] = b"ERROR\n";

/// Decoder and encoder for the line protocol.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Longest unterminated line held in the buffer
    max_line_len: usize,
    /// Request for the overlong line being dropped, if any
    discarding: Option<Request>,
}

impl LineCodec {
    /// Creates a line codec that buffers lines of up to `max_line_len` bytes.
    pub fn new(max_line_len: usize) -> Self {
        Self {
            max_line_len,
            discarding: None,
        }
    }

    /// Removes one complete line from the front of `buf` and decodes it.
    ///
    /// Returns `None` and leaves `buf` untouched if no `\n` has arrived yet,
    /// unless the partial line has reached the limit: then it is dropped and
    /// so is everything up to the next `\n`.
    /// Decoding never fails: a malformed line is [`Request::Invalid`].
    pub fn decode(&mut self, buf: &mut BytesMut) -> Option<Request> {
        let newline = buf.iter().position(|&b| b == b'\n');

        if let Some(request) = self.discarding.take() {
            return match newline {
                Some(pos) => {
                    buf.advance(pos + 1);
                    Some(request)
                }
                None => {
                    buf.clear();
                    self.discarding = Some(request);
                    None
                }
            };
        }

        match newline {
            Some(pos) => {
                let line = buf.split_to(pos + 1).freeze();
                trace!(len = line.len(), "Decoded line");
                Some(parse_line(line))
            }
            None if buf.len() >= self.max_line_len => {
                debug!(
                    buffered = buf.len(),
                    max = self.max_line_len,
                    "Skipping line over the size limit"
                );
                self.discarding = Some(overlong_request(buf));
                buf.clear();
                None
            }
            None => None,
        }
    }

    /// Appends the wire form of `reply` to `dst`.
    pub fn encode(&self, reply: &Reply, dst: &mut BytesMut) {
        match reply {
            Reply::Value(value) => {
                dst.reserve(value.len() + 1);
                dst.put_slice(value);
                dst.put_u8(b'\n');
            }
            Reply::NotFound => dst.put_slice(NOT_FOUND),
            Reply::Stored => dst.put_slice(OK),
            Reply::TooLong | Reply::Invalid => dst.put_slice(ERROR),
        }
    }
}

/// The request for a line cut off at the limit, judged by its command.
fn overlong_request(partial: &[u8]) -> Request {
    match partial.get(..3) {
        Some(b"GET") => Request::GetTooLong,
        Some(b"PUT") => Request::PutTooLong,
        _ => Request::Invalid,
    }
}

/// Parses one line, terminator included.
fn parse_line(line: Bytes) -> Request {
    // "GET\n" is the shortest line worth looking at
    if line.len() < 4 {
        return Request::Invalid;
    }

    let content = line.slice(..line.len() - 1);
    let rest = skip_spaces(&content, 3);

    match &content[..3] {
        b"GET" if !rest.is_empty() => Request::Get { key: rest },
        b"PUT" => match rest.iter().position(|&b| b == b' ') {
            Some(space) if space > 0 => Request::Put {
                key: rest.slice(..space),
                value: rest.slice(space + 1..),
            },
            _ => Request::Invalid,
        },
        _ => Request::Invalid,
    }
}

/// Returns `content` from `start` onward with leading spaces removed.
fn skip_spaces(content: &Bytes, start: usize) -> Bytes {
    let offset = content[start..]
        .iter()
        .position(|&b| b != b' ')
        .map_or(content.len(), |pos| start + pos);
    content.slice(offset..)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(input: &[u8]) -> Request {
        let mut buf = BytesMut::from(input);
        let request = LineCodec::new(1024).decode(&mut buf).unwrap();
        assert!(buf.is_empty(), "line not fully consumed");
        request
    }

    fn put(key: &str, value: &str) -> Request {
        Request::Put {
            key: Bytes::from(key.to_string()),
            value: Bytes::from(value.to_string()),
        }
    }

    fn get(key: &str) -> Request {
        Request::Get {
            key: Bytes::from(key.to_string()),
        }
    }

    #[test]
    fn test_decode_get_and_put() {
        assert_eq!(decode_one(b"GET abc\n"), get("abc"));
        assert_eq!(decode_one(b"PUT abc 123\n"), put("abc", "123"));
    }

    #[test]
    fn test_runs_of_spaces_are_skipped() {
        assert_eq!(decode_one(b"GET    abc\n"), get("abc"));
        assert_eq!(decode_one(b"PUT   abc 123\n"), put("abc", "123"));
    }

    #[test]
    fn test_value_keeps_spaces() {
        assert_eq!(
            decode_one(b"PUT greeting hello big world\n"),
            put("greeting", "hello big world")
        );
        assert_eq!(decode_one(b"PUT k  two\n"), put("k", " two"));
        assert_eq!(decode_one(b"PUT k \n"), put("k", ""));
    }

    #[test]
    fn test_carriage_return_is_content() {
        assert_eq!(decode_one(b"GET abc\r\n"), get("abc\r"));
    }

    #[test]
    fn test_invalid_lines() {
        assert_eq!(decode_one(b"\n"), Request::Invalid);
        assert_eq!(decode_one(b"GE\n"), Request::Invalid);
        assert_eq!(decode_one(b"GET\n"), Request::Invalid);
        assert_eq!(decode_one(b"GET   \n"), Request::Invalid);
        assert_eq!(decode_one(b"PUT\n"), Request::Invalid);
        assert_eq!(decode_one(b"PUT keyonly\n"), Request::Invalid);
        assert_eq!(decode_one(b"DEL abc\n"), Request::Invalid);
        assert_eq!(decode_one(b"get abc\n"), Request::Invalid);
    }

    #[test]
    fn test_incomplete_line_is_left_in_buffer() {
        let mut codec = LineCodec::new(1024);
        let mut buf = BytesMut::from(&b"PUT abc 1"[..]);
        assert_eq!(codec.decode(&mut buf), None);
        assert_eq!(&buf[..], b"PUT abc 1");

        buf.extend_from_slice(b"23\nGET abc\nGET");
        assert_eq!(codec.decode(&mut buf), Some(put("abc", "123")));
        assert_eq!(codec.decode(&mut buf), Some(get("abc")));
        assert_eq!(codec.decode(&mut buf), None);
        assert_eq!(&buf[..], b"GET");
    }

    #[test]
    fn test_encode() {
        let codec = LineCodec::new(1024);
        let mut out = BytesMut::new();
        codec.encode(&Reply::Stored, &mut out);
        codec.encode(&Reply::Value(Bytes::from("123")), &mut out);
        codec.encode(&Reply::NotFound, &mut out);
        codec.encode(&Reply::TooLong, &mut out);
        codec.encode(&Reply::Invalid, &mut out);
        assert_eq!(&out[..], b"OK\n123\nNOTFOUND\nERROR\nERROR\n");
    }

    #[test]
    fn test_overlong_put_is_dropped_to_newline() {
        let mut codec = LineCodec::new(16);
        let mut buf = BytesMut::from(&b"PUT k xxxxxxxxxxxxxxxxxxxx"[..]);

        assert_eq!(codec.decode(&mut buf), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(&[b'x'; 40]);
        assert_eq!(codec.decode(&mut buf), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"xx\nGET k\n");
        assert_eq!(codec.decode(&mut buf), Some(Request::PutTooLong));
        assert_eq!(codec.decode(&mut buf), Some(get("k")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overlong_get_and_unknown_lines() {
        let mut codec = LineCodec::new(8);

        let mut buf = BytesMut::from(&b"GET 0123456789"[..]);
        assert_eq!(codec.decode(&mut buf), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf), Some(Request::GetTooLong));

        buf.extend_from_slice(b"DEL 0123456789\n");
        // A whole line is parsed even past the limit
        assert_eq!(codec.decode(&mut buf), Some(Request::Invalid));

        buf.extend_from_slice(b"DEL 0123456789");
        assert_eq!(codec.decode(&mut buf), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf), Some(Request::Invalid));
    }

    #[test]
    fn test_line_under_limit_waits() {
        let mut codec = LineCodec::new(16);
        let mut buf = BytesMut::from(&b"PUT k 123456789"[..]);
        assert_eq!(codec.decode(&mut buf), None);
        assert_eq!(buf.len(), 15);
    }
}
