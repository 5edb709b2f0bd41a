//! Connection Manager
//!
//! Owns the bound `TcpListener` and turns accepted sockets into connection
//! tasks, never serving more than `max_connections` clients at once.
//!
//! ```text
//!        ┌──────────────────────────────┐
//!        │ acquire permit (may suspend) │◄─────────────┐
//!        └──────────────┬───────────────┘              │
//!                       ▼                              │
//!        ┌──────────────────────────────┐              │
//!        │ accept (backoff on error)    │              │
//!        └──────────────┬───────────────┘              │
//!                       ▼                              │
//!        ┌──────────────────────────────┐              │
//!        │ socket options               │              │
//!        └──────────────┬───────────────┘              │
//!                       ▼                              │
//!        ┌──────────────────────────────┐   permit     │
//!        │ spawn ConnectionHandler      │── dropped ───┘
//!        └──────────────────────────────┘   on exit
//! ```
//!
//! The permit is taken before `accept`, so once the ceiling is reached new
//! clients wait in the kernel backlog until a slot frees.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::handler::{handle_connection, ConnectionSettings, ConnectionStats};
use crate::connection::pool::BufferPool;
use crate::storage::ShardedCache;
use socket2::{SockRef, TcpKeepalive};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Longest pause between failed accepts
const MAX_ACCEPT_BACKOFF_SECS: u64 = 64;

/// Accepts clients and spawns one task per connection.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    config: Config,
    command_handler: CommandHandler,
    pool: Arc<BufferPool>,
    stats: Arc<ConnectionStats>,
    /// One permit per connection that may be served concurrently
    limit_connections: Arc<Semaphore>,
}

impl Listener {
    /// Wraps an already bound listener.
    pub fn new(
        listener: TcpListener,
        config: Config,
        cache: Arc<ShardedCache>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        let command_handler = CommandHandler::new(cache, config.max_key_value_len);
        let pool = Arc::new(BufferPool::new(
            config.buffer_pool_size,
            config.write_buffer_size,
        ));
        let limit_connections = Arc::new(Semaphore::new(config.max_connections));

        Self {
            listener,
            config,
            command_handler,
            pool,
            stats,
            limit_connections,
        }
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The response buffer pool shared by all connections.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Runs the accept loop. Only returns if the connection limiter is closed.
    pub async fn run(self) -> io::Result<()> {
        let settings = ConnectionSettings::from_config(&self.config);

        loop {
            // Wait for a free slot before taking another client off the backlog
            let permit = Arc::clone(&self.limit_connections)
                .acquire_owned()
                .await
                .map_err(|_| io::Error::other("connection limiter closed"))?;

            let (stream, addr) = self.accept().await;

            if let Err(e) = configure_stream(&stream, &self.config) {
                warn!(client = %addr, error = %e, "Failed to apply socket options");
            }

            let command_handler = self.command_handler.clone();
            let pool = Arc::clone(&self.pool);
            let stats = Arc::clone(&self.stats);

            tokio::spawn(async move {
                handle_connection(stream, addr, command_handler, pool, stats, settings).await;
                drop(permit);
            });
        }
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep running on the runtime.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                Ok(())
            }
        }
    }

    /// Accepts one connection, retrying failed accepts.
    ///
    /// Waits 1, 2, 4 ... seconds between attempts, capped at 64, so running
    /// out of file descriptors does not spin the accept loop.
    async fn accept(&self) -> (TcpStream, SocketAddr) {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok(accepted) => return accepted,
                Err(e) => {
                    error!(error = %e, retry_in_secs = backoff, "Failed to accept connection");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = (backoff * 2).min(MAX_ACCEPT_BACKOFF_SECS);
        }
    }
}

/// Applies the per-connection transport options.
///
/// Sockets close with an immediate reset (`SO_LINGER` 0), send small replies
/// without Nagle delay, and probe idle peers with keep-alives.
fn configure_stream(stream: &TcpStream, config: &Config) -> io::Result<()> {
    stream.set_nodelay(true)?;

    let socket = SockRef::from(stream);
    socket.set_linger(Some(Duration::ZERO))?;
    socket.set_tcp_keepalive(&TcpKeepalive::new().with_time(config.keepalive_interval))?;
    socket.set_recv_buffer_size(config.read_buffer_size)?;
    socket.set_send_buffer_size(config.write_buffer_size)?;
    Ok(())
}
