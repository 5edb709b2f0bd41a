//! Incremental RESP Request Parser
//!
//! Parses one request frame, `*<argc>\r\n` followed by `argc` bulk strings,
//! from the front of a connection buffer.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((Parsed::Frame(value), consumed)))` - A complete frame,
//!   `consumed` bytes long
//! - `Ok(Some((Parsed::TooLarge(oversized), consumed)))` - The frame would
//!   outgrow the frame limit. `consumed` runs through the header of the bulk
//!   string that crosses it; its payload and any later elements are left for
//!   the caller to skip.
//! - `Ok(None)` - The frame is incomplete; nothing was consumed
//! - `Err(ParseError)` - The bytes cannot be a frame. Frame boundaries are
//!   now unknown, so the caller has to drop the connection.
//!
//! This lets the connection handler:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse()` to attempt parsing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, disconnect the client
//!
//! Only the request shape is checked here. Whether the array is a GET or a
//! PUT is decided by [`Request::from_resp`](crate::protocol::Request::from_resp).

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A header line started with the wrong type byte
    #[error("unexpected type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer in an array or bulk string header
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Protocol violation (missing CRLF, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// An array with more elements than any request needs
    #[error("too many array elements: {count} (max: {max})")]
    TooManyElements { count: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum number of elements accepted in a request array.
pub const MAX_ARRAY_LEN: usize = 1024;

/// The outcome of parsing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// A complete request frame
    Frame(RespValue),
    /// A frame longer than the frame limit, cut short at the bulk string
    /// that crosses it
    TooLarge(Oversized),
}

/// The known part of a frame that crosses the frame limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Oversized {
    /// Elements that arrived before the crossing bulk string
    pub parsed: Vec<RespValue>,
    /// Element count from the array header
    pub argc: usize,
    /// Payload bytes of the crossing bulk string, CRLF included
    pub skip: usize,
}

impl Oversized {
    /// Elements after the crossing bulk string.
    pub fn remaining(&self) -> usize {
        self.argc - self.parsed.len() - 1
    }
}

/// One element of a request array.
enum Element {
    Value(RespValue),
    /// Bulk string payload of this many bytes plus CRLF that would overflow
    /// the frame
    TooLarge(usize),
}

/// An incremental parser for RESP request frames.
///
/// # Example
///
/// ```
/// use kvcache::protocol::parser::{Parsed, RespParser};
/// use kvcache::protocol::RespValue;
/// use bytes::Bytes;
///
/// let parser = RespParser::new(64 * 1024);
/// let (parsed, consumed) = parser
///     .parse(b"*2\r\n$3\r\nGET\r\n$3\r\nabc\r\n")
///     .unwrap()
///     .unwrap();
///
/// assert_eq!(consumed, 22);
/// assert_eq!(
///     parsed,
///     Parsed::Frame(RespValue::Array(vec![
///         RespValue::BulkString(Bytes::from("GET")),
///         RespValue::BulkString(Bytes::from("abc")),
///     ]))
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RespParser {
    /// Largest frame, headers included, that is buffered whole
    max_frame_len: usize,
}

impl RespParser {
    /// Creates a parser for frames of at most `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Attempts to parse one request frame from the front of `buf`.
    ///
    /// A negative element count parses as [`RespValue::Null`].
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Parsed, usize)>> {
        let (count, mut consumed) = match read_header(buf, prefix::ARRAY)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count < 0 {
            return Ok(Some((Parsed::Frame(RespValue::Null), consumed)));
        }

        let count = count as usize;
        if count > MAX_ARRAY_LEN {
            return Err(ParseError::TooManyElements {
                count,
                max: MAX_ARRAY_LEN,
            });
        }

        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            match self.parse_bulk_string(buf, consumed)? {
                Some((Element::Value(value), element_len)) => {
                    elements.push(value);
                    consumed += element_len;
                }
                Some((Element::TooLarge(skip), header_len)) => {
                    let oversized = Oversized {
                        parsed: elements,
                        argc: count,
                        skip,
                    };
                    return Ok(Some((Parsed::TooLarge(oversized), consumed + header_len)));
                }
                None => return Ok(None), // Incomplete
            }
        }

        Ok(Some((Parsed::Frame(RespValue::Array(elements)), consumed)))
    }

    /// Parses a bulk string, `$<length>\r\n<data>\r\n`, starting at `offset`.
    fn parse_bulk_string(&self, buf: &[u8], offset: usize) -> ParseResult<Option<(Element, usize)>> {
        let (length, header_len) = match read_bulk_header(&buf[offset..])? {
            Some(header) => header,
            None => return Ok(None),
        };

        // Any negative length is a null token with no payload
        if length < 0 {
            return Ok(Some((Element::Value(RespValue::Null), header_len)));
        }

        let payload_len = (length as usize).saturating_add(CRLF.len());
        let data_start = offset + header_len;
        if data_start.saturating_add(payload_len) > self.max_frame_len {
            return Ok(Some((Element::TooLarge(payload_len), header_len)));
        }

        let end = data_start + payload_len;
        if buf.len() < end {
            return Ok(None); // Incomplete
        }

        let data_end = end - CRLF.len();
        if &buf[data_end..end] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_end]);
        Ok(Some((Element::Value(RespValue::BulkString(data)), end - offset)))
    }
}

/// Reads a `$<integer>\r\n` bulk string header.
///
/// Returns the declared length and the length of the header line.
pub(crate) fn read_bulk_header(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    read_header(buf, prefix::BULK_STRING)
}

/// Reads a `<prefix><integer>\r\n` header line.
///
/// Returns the integer and the length of the line including its CRLF.
fn read_header(buf: &[u8], expected: u8) -> ParseResult<Option<(i64, usize)>> {
    let first = match buf.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    if first != expected {
        return Err(ParseError::UnknownPrefix(first));
    }

    let newline = match find_newline(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };
    if newline < 2 || buf[newline - 1] != b'\r' {
        return Err(ParseError::ProtocolError(
            "header line not terminated by CRLF".to_string(),
        ));
    }

    let digits = &buf[1..newline - 1];
    let n = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned()))?;

    Ok(Some((n, newline + 1)))
}

/// Finds the position of the first `\n` in the buffer.
#[inline]
fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let parsed = RespParser::new(1024).parse(buf)?;
        Ok(parsed.map(|(parsed, consumed)| match parsed {
            Parsed::Frame(value) => (value, consumed),
            Parsed::TooLarge(oversized) => panic!("unexpected oversized frame: {:?}", oversized),
        }))
    }

    fn bulk(s: &str) -> RespValue {
        RespValue::BulkString(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_parse_get() {
        let input = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("GET"), bulk("name")]));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_put() {
        let input = b"*3\r\n$3\r\nPUT\r\n$3\r\nabc\r\n$3\r\n123\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![bulk("PUT"), bulk("abc"), bulk("123")])
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_every_prefix_is_incomplete() {
        let input = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$4\r\nAriz\r\n";
        for end in 0..input.len() {
            assert_eq!(
                parse_message(&input[..end]).unwrap(),
                None,
                "prefix of {} bytes parsed",
                end
            );
        }
        assert!(parse_message(input).unwrap().is_some());
    }

    #[test]
    fn test_pipelined_frames_consume_one() {
        let input = b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n*2\r\n$3\r\nGET\r\n$1\r\nb\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("GET"), bulk("a")]));
        assert_eq!(consumed, 20);

        let (value, _) = parse_message(&input[consumed..]).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("GET"), bulk("b")]));
    }

    #[test]
    fn test_negative_bulk_length_is_null() {
        let input = b"*2\r\n$3\r\nGET\r\n$-1\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("GET"), RespValue::Null]));
        assert_eq!(consumed, input.len());

        // Any negative length, not only -1
        let (value, _) = parse_message(b"*1\r\n$-7\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![RespValue::Null]));
    }

    #[test]
    fn test_negative_and_empty_arrays() {
        let (value, consumed) = parse_message(b"*-1\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Null);
        assert_eq!(consumed, 5);

        let (value, _) = parse_message(b"*0\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![]));
    }

    #[test]
    fn test_empty_and_binary_bulk_strings() {
        let (value, _) = parse_message(b"*1\r\n$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("")]));

        let (value, _) = parse_message(b"*1\r\n$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![RespValue::BulkString(Bytes::from(&b"hel\x00o"[..]))])
        );
    }

    #[test]
    fn test_payload_may_contain_crlf() {
        let (value, _) = parse_message(b"*1\r\n$4\r\na\r\nb\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Array(vec![bulk("a\r\nb")]));
    }

    #[test]
    fn test_framing_errors() {
        assert_eq!(
            parse_message(b"+OK\r\n"),
            Err(ParseError::UnknownPrefix(b'+'))
        );
        assert_eq!(
            parse_message(b"*1\r\n:1\r\n"),
            Err(ParseError::UnknownPrefix(b':'))
        );
        assert!(matches!(
            parse_message(b"*x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(
            parse_message(b"*\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(
            parse_message(b"*1\n"),
            Err(ParseError::ProtocolError(_))
        ));
        assert!(matches!(
            parse_message(b"*1\r\n$3\r\nabcXY"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_too_many_elements() {
        assert_eq!(
            parse_message(b"*5000\r\n"),
            Err(ParseError::TooManyElements {
                count: 5000,
                max: MAX_ARRAY_LEN
            })
        );
    }

    #[test]
    fn test_bulk_longer_than_frame_limit() {
        let parser = RespParser::new(1024);
        let (parsed, consumed) = parser.parse(b"*1\r\n$2048\r\nxx").unwrap().unwrap();
        assert_eq!(consumed, 11);
        assert_eq!(
            parsed,
            Parsed::TooLarge(Oversized {
                parsed: vec![],
                argc: 1,
                skip: 2050,
            })
        );
    }

    #[test]
    fn test_frame_crossing_limit_stops_at_crossing_element() {
        let parser = RespParser::new(32);

        // 20 bytes of headers and elements, then a 20-byte value: 47 in total
        let input = b"*3\r\n$3\r\nPUT\r\n$1\r\nk\r\n$20\r\n";
        let (parsed, consumed) = parser.parse(input).unwrap().unwrap();
        assert_eq!(consumed, input.len());
        match parsed {
            Parsed::TooLarge(oversized) => {
                assert_eq!(oversized.parsed, vec![bulk("PUT"), bulk("k")]);
                assert_eq!(oversized.skip, 22);
                assert_eq!(oversized.remaining(), 0);
            }
            other => panic!("expected oversized frame, got {:?}", other),
        }

        // The same frame with a 5-byte value fits in 31 bytes
        let input = b"*3\r\n$3\r\nPUT\r\n$1\r\nk\r\n$5\r\nhello\r\n";
        let (parsed, consumed) = parser.parse(input).unwrap().unwrap();
        assert_eq!(consumed, 31);
        assert_eq!(
            parsed,
            Parsed::Frame(RespValue::Array(vec![bulk("PUT"), bulk("k"), bulk("hello")]))
        );
    }

    #[test]
    fn test_oversized_key_leaves_later_elements() {
        let parser = RespParser::new(64);
        let (parsed, consumed) = parser.parse(b"*3\r\n$3\r\nSET\r\n$100\r\n").unwrap().unwrap();
        assert_eq!(consumed, 19);
        match parsed {
            Parsed::TooLarge(oversized) => {
                assert_eq!(oversized.parsed, vec![bulk("SET")]);
                assert_eq!(oversized.remaining(), 1);
            }
            other => panic!("expected oversized frame, got {:?}", other),
        }
    }
}
