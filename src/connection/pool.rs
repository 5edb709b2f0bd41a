//! Response Buffer Pool
//!
//! Replies are encoded into a `BytesMut` checked out from a shared pool and
//! handed back once the batch has been written to the socket. Under steady
//! load the serving loop allocates no response buffers at all.
//!
//! ```text
//!   checkout() ──> PooledBuffer ──> encode replies ──> write + flush
//!        ▲                                                 │
//!        └──────────────── Drop: clear + push ◄────────────┘
//! ```
//!
//! A buffer is owned by exactly one guard at a time. Buffers that grew past
//! twice the nominal size are dropped instead of returned, so one large
//! pipelined batch cannot pin memory in the pool forever.

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A bounded pool of reusable byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    buffers: ArrayQueue<BytesMut>,
    buffer_size: usize,
}

impl BufferPool {
    /// Creates a pool holding up to `pool_size` idle buffers of
    /// `buffer_size` bytes, all allocated up front.
    pub fn new(pool_size: usize, buffer_size: usize) -> Self {
        let buffers = ArrayQueue::new(pool_size.max(1));
        for _ in 0..buffers.capacity() {
            let _ = buffers.push(BytesMut::with_capacity(buffer_size));
        }

        Self {
            buffers,
            buffer_size,
        }
    }

    /// Takes an idle buffer, allocating a fresh one if the pool is empty.
    pub fn checkout(self: &Arc<Self>) -> PooledBuffer {
        let buf = self
            .buffers
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_size));

        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    /// Number of idle buffers currently in the pool.
    pub fn available(&self) -> usize {
        self.buffers.len()
    }

    /// Nominal capacity of each buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn give_back(&self, mut buf: BytesMut) {
        if buf.capacity() > self.buffer_size * 2 {
            return;
        }
        buf.clear();
        // A full pool just drops the buffer
        let _ = self.buffers.push(buf);
    }
}

/// A buffer checked out of a [`BufferPool`], returned to it on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: BytesMut,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.give_back(buf);
    }
}
