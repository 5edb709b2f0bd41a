//! RESP Data Types
//!
//! The subset of the Redis Serialization Protocol the cache speaks.
//! Requests are arrays of bulk strings; replies are simple strings, errors,
//! bulk strings or the null bulk string.
//!
//! ## Protocol Format
//!
//! Each RESP type starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `$` Bulk String
//! - `*` Array
//!
//! All types are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR invalid command\r\n`
//! Bulk String: `$3\r\n123\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$3\r\nabc\r\n`
//! Null Bulk String: `$-1\r\n`

use bytes::{BufMut, Bytes};

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A value in a parsed request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string (`$-1\r\n`), or any negative length
    Null,

    /// Array of values.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a new bulk string value.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }
}

/// Writes `data` as a bulk string: `$<length>\r\n<data>\r\n`.
///
/// Use this with a pooled buffer on the hot path; nothing is allocated
/// besides growth of `buf` itself.
///
/// # Example
/// ```
/// use kvcache::protocol::types::put_bulk_string;
/// use bytes::BytesMut;
/// let mut buf = BytesMut::new();
/// put_bulk_string(&mut buf, b"hello");
/// assert_eq!(&buf[..], b"$5\r\nhello\r\n");
/// ```
pub fn put_bulk_string<B: BufMut>(buf: &mut B, data: &[u8]) {
    buf.put_u8(prefix::BULK_STRING);
    put_decimal(buf, data.len());
    buf.put_slice(CRLF);
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

/// Writes the decimal digits of `n`.
fn put_decimal<B: BufMut>(buf: &mut B, mut n: usize) {
    // u64::MAX has 20 digits
    let mut digits = [0u8; 20];
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buf.put_slice(&digits[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn bulk_bytes(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        put_bulk_string(&mut buf, data);
        buf
    }

    #[test]
    fn test_bulk_string() {
        assert_eq!(bulk_bytes(b"123"), b"$3\r\n123\r\n");
        assert_eq!(bulk_bytes(b""), b"$0\r\n\r\n");
        assert_eq!(bulk_bytes(b"a\r\nb"), b"$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_length_digits() {
        for len in [9usize, 10, 99, 100, 255, 256, 65_536, 70_000] {
            let data = vec![b'x'; len];
            let encoded = bulk_bytes(&data);
            let header = format!("${}\r\n", len);
            assert!(encoded.starts_with(header.as_bytes()), "bad header for {}", len);
            assert_eq!(encoded.len(), header.len() + len + 2);
        }
    }

    #[test]
    fn test_put_decimal_extremes() {
        let mut buf = BytesMut::new();
        put_decimal(&mut buf, 0);
        assert_eq!(&buf[..], b"0");

        buf.clear();
        put_decimal(&mut buf, usize::MAX);
        assert_eq!(&buf[..], usize::MAX.to_string().as_bytes());
    }
}
