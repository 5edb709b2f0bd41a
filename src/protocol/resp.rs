//! RESP-subset codec: frames in, [`Request`]s out, [`Reply`]s back as RESP.
//!
//! A frame longer than the frame limit is never buffered whole. Once the
//! header of the bulk string that crosses the limit arrives, the codec drops
//! that payload and the rest of the frame as the bytes come in, then yields
//! the request the frame would have been so the client still gets a reply.

use crate::protocol::command::{Reply, Request};
use crate::protocol::parser::{read_bulk_header, Oversized, ParseResult, Parsed, RespParser};
use crate::protocol::types::put_bulk_string;
use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, trace};

const OK: &[u8] = b"+OK\r\n";
const NULL_BULK: &[u8] = b"$-1\r\n";
const ERR_TOO_LONG: &[u8] = b"-ERR key or value too long\r\n";
const ERR_INVALID: &[u8] = b"-ERR invalid command\r\n";

/// Progress through a frame being skipped.
#[derive(Debug, Clone)]
struct Discard {
    /// Request answered once the frame is gone
    request: Request,
    /// Bytes of the current payload still to drop, CRLF included
    payload_left: usize,
    /// Elements after the current one still to drop
    elements_left: usize,
}

/// Decoder and encoder for the Redis-compatible request subset.
#[derive(Debug, Clone)]
pub struct RespCodec {
    parser: RespParser,
    discard: Option<Discard>,
}

impl RespCodec {
    /// Creates a codec that buffers frames of at most `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            parser: RespParser::new(max_frame_len),
            discard: None,
        }
    }

    /// Removes one complete frame from the front of `buf` and decodes it.
    ///
    /// Incomplete frames leave `buf` untouched and return `Ok(None)`, except
    /// while an oversized frame is being skipped: its bytes are dropped as
    /// they arrive.
    pub fn decode(&mut self, buf: &mut BytesMut) -> ParseResult<Option<Request>> {
        if self.discard.is_none() {
            match self.parser.parse(buf)? {
                Some((Parsed::Frame(frame), consumed)) => {
                    buf.advance(consumed);
                    trace!(consumed, remaining = buf.len(), "Parsed frame");
                    return Ok(Some(Request::from_resp(frame)));
                }
                Some((Parsed::TooLarge(oversized), consumed)) => {
                    buf.advance(consumed);
                    debug!(
                        argc = oversized.argc,
                        payload = oversized.skip,
                        "Skipping frame over the size limit"
                    );
                    self.discard = Some(Discard::new(&oversized));
                }
                None => return Ok(None),
            }
        }

        self.skip_discarded(buf)
    }

    /// Drops buffered bytes of the frame being skipped.
    ///
    /// Returns the frame's request once its last byte is gone.
    fn skip_discarded(&mut self, buf: &mut BytesMut) -> ParseResult<Option<Request>> {
        let discard = match self.discard.as_mut() {
            Some(discard) => discard,
            None => return Ok(None),
        };

        loop {
            let n = discard.payload_left.min(buf.len());
            buf.advance(n);
            discard.payload_left -= n;
            if discard.payload_left > 0 {
                return Ok(None);
            }

            if discard.elements_left == 0 {
                break;
            }

            let (length, header_len) = match read_bulk_header(buf)? {
                Some(header) => header,
                None => return Ok(None),
            };
            buf.advance(header_len);
            discard.elements_left -= 1;

            if length < 0 {
                discard.request = Request::Invalid;
            } else {
                discard.payload_left = (length as usize).saturating_add(2);
            }
        }

        Ok(self.discard.take().map(|discard| discard.request))
    }

    /// Appends the wire form of `reply` to `dst`.
    pub fn encode(&self, reply: &Reply, dst: &mut BytesMut) {
        match reply {
            Reply::Value(value) => {
                dst.reserve(value.len() + 16);
                put_bulk_string(dst, value);
            }
            Reply::NotFound => dst.put_slice(NULL_BULK),
            Reply::Stored => dst.put_slice(OK),
            Reply::TooLong => dst.put_slice(ERR_TOO_LONG),
            Reply::Invalid => dst.put_slice(ERR_INVALID),
        }
    }
}

impl Discard {
    fn new(oversized: &Oversized) -> Self {
        Self {
            request: Request::from_oversized_resp(&oversized.parsed, oversized.argc),
            payload_left: oversized.skip,
            elements_left: oversized.remaining(),
        }
    }
}
