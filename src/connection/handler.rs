//! Connection Handler Module
//!
//! This module serves individual client connections. Each client gets its
//! own handler task that runs in a loop, reading requests and sending
//! replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client admitted and accepted
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────────┐
//!    │      Main Loop                   │
//!    │                                  │
//!    │  ┌─────────────────────────────┐ │
//!    │  │ Decode every complete frame │ │
//!    │  └─────────────┬───────────────┘ │
//!    │                │                 │
//!    │                ▼                 │
//!    │  ┌─────────────────────────────┐ │
//!    │  │ Execute, encode replies     │ │
//!    │  │ into one pooled buffer      │ │
//!    │  └─────────────┬───────────────┘ │
//!    │                │                 │
//!    │                ▼                 │
//!    │  ┌─────────────────────────────┐ │
//!    │  │ Write + flush the batch     │ │
//!    │  └─────────────┬───────────────┘ │
//!    │                │                 │
//!    │                ▼                 │
//!    │  ┌─────────────────────────────┐ │
//!    │  │ Read more bytes             │ │
//!    │  └─────────────┬───────────────┘ │
//!    │                ▼                 │
//!    │           [Loop back]            │
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF, framing error, runaway header or I/O error
//!        │
//!        ▼
//! 5. Handler task ends, admission permit released
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a per-connection `BytesMut`, since TCP may
//! deliver partial frames or several frames in a single read. Replies for
//! everything decoded from one read are batched into a single buffer from
//! the shared [`BufferPool`] and flushed together.
//!
//! The handler is generic over the stream so the loop can be driven by an
//! in-memory mock as well as a `TcpStream`.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::pool::BufferPool;
use crate::protocol::{Codec, ParseError, Protocol};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};

/// Minimum free space kept in the read buffer before each read
const MIN_READ_SPACE: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Number of connections currently being served.
    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Per-connection settings taken from the server [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Wire format spoken on the connection
    pub protocol: Protocol,
    /// Initial read buffer capacity
    pub read_buffer_size: usize,
    /// Write buffer capacity
    pub write_buffer_size: usize,
    /// Largest request buffered whole. Longer requests are skipped and
    /// answered as too long.
    pub max_frame_size: usize,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            protocol: config.protocol,
            read_buffer_size: config.read_buffer_size,
            write_buffer_size: config.write_buffer_size,
            max_frame_size: config.max_frame_size,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Handles a single client connection.
///
/// This struct manages the read buffer, decoding, and reply batching for
/// one connected client.
pub struct ConnectionHandler<S> {
    /// The client stream, write side buffered
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Line or RESP codec
    codec: Codec,

    /// The command handler (shares the cache with every connection)
    command_handler: CommandHandler,

    /// Response buffers (shared)
    pool: Arc<BufferPool>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    settings: ConnectionSettings,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing requests
    /// * `pool` - Shared response buffer pool
    /// * `stats` - Shared connection statistics
    /// * `settings` - Protocol and buffer limits
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        pool: Arc<BufferPool>,
        stats: Arc<ConnectionStats>,
        settings: ConnectionSettings,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::with_capacity(settings.write_buffer_size, stream),
            addr,
            buffer: BytesMut::with_capacity(settings.read_buffer_size),
            codec: Codec::new(settings.protocol, settings.max_frame_size),
            command_handler,
            pool,
            stats,
            settings,
        }
    }

    /// Runs the main connection loop.
    ///
    /// This method reads requests from the client, executes them, and sends
    /// back replies until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, protocol = %self.settings.protocol, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => debug!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.process_buffered().await?;

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Executes every complete request in the buffer and flushes the replies.
    ///
    /// Replies produced before a framing error are still sent.
    async fn process_buffered(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut out = self.pool.checkout();
        let outcome = loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(request)) => {
                    let reply = self.command_handler.execute(request);
                    self.codec.encode(&reply, &mut out);
                    self.stats.command_processed();
                }
                Ok(None) => {
                    trace!(
                        client = %self.addr,
                        buffered = self.buffer.len(),
                        "Incomplete frame, need more data"
                    );
                    break Ok(());
                }
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Framing error");
                    break Err(ConnectionError::ParseError(e));
                }
            }
        };

        if !out.is_empty() {
            self.stream.write_all(&out).await?;
            self.stream.flush().await?;
            self.stats.bytes_written(out.len());
            trace!(client = %self.addr, bytes = out.len(), "Sent replies");
        }

        outcome
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        // Check buffer size limit
        if self.buffer.len() >= self.settings.max_frame_size {
            warn!(
                client = %self.addr,
                size = self.buffer.len(),
                max = self.settings.max_frame_size,
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < MIN_READ_SPACE {
            self.buffer.reserve(self.settings.read_buffer_size);
        }

        // Read data
        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial frame in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Framing error, the stream can no longer be split into requests
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial frame)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Input that never forms a frame header filled the buffer
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler and runs
/// it to completion. The outcome has already been logged by the handler.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    pool: Arc<BufferPool>,
    stats: Arc<ConnectionStats>,
    settings: ConnectionSettings,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, pool, stats, settings);
    let _ = handler.run().await;
}
