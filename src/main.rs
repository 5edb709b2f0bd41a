//! kvcache - A Sharded In-Memory LRU Cache Server
//!
//! This is the main entry point for the kvcache server.
//! It parses the command line, builds the cache, and runs the listener until
//! Ctrl+C.

use anyhow::Context;
use kvcache::config::{ArgsOutcome, Config};
use kvcache::connection::{ConnectionStats, Listener};
use kvcache::storage::ShardedCache;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
kvcache - A Sharded In-Memory LRU Cache Server

USAGE:
    kvcache [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 7171)
        --protocol <line|resp>     Wire protocol (default: line)
        --shards <N>               Number of shards, a power of two (default: 16)
        --capacity <N>             Entries per shard (default: 20000)
        --max-value-len <BYTES>    Longest key or value accepted (default: 256)
        --max-connections <N>      Clients served at once (default: 10000)
        --buffer-size <BYTES>      Socket and reply buffer size (default: 4096)
    -v, --version                  Print version information
        --help                     Print this help message

EXAMPLES:
    kvcache                          # Line protocol on 127.0.0.1:7171
    kvcache --protocol resp          # Speak RESP, usable from redis-cli
    kvcache --shards 64 --capacity 1000

CONNECTING:
    $ printf 'PUT abc 123\nGET abc\n' | nc 127.0.0.1 7171
    OK
    123

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=kvcache=debug
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
kvcache v{} - Sharded In-Memory LRU Cache
──────────────────────────────────────────────────────────────
Protocol:        {}
Shards:          {} x {} entries
Max connections: {}
Server started on {}

Use Ctrl+C to shutdown gracefully.
"#,
        kvcache::VERSION,
        config.protocol,
        config.shard_count,
        config.capacity_per_shard,
        config.max_connections,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(ArgsOutcome::Run(config)) => config,
        Ok(ArgsOutcome::Help) => {
            print_help();
            return Ok(());
        }
        Ok(ArgsOutcome::Version) => {
            println!("kvcache version {}", kvcache::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // Create the cache (shared across all connections)
    let cache = Arc::new(ShardedCache::new(
        config.shard_count,
        config.capacity_per_shard,
    )?);
    info!(
        shards = cache.shard_count(),
        per_shard = cache.capacity_per_shard(),
        capacity = cache.capacity(),
        "Cache initialized"
    );

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let tcp = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), protocol = %config.protocol, "Listening");

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let listener = Listener::new(tcp, config, Arc::clone(&cache), Arc::clone(&stats));
    info!(
        buffers = listener.pool().available(),
        buffer_size = listener.pool().buffer_size(),
        "Response buffer pool ready"
    );
    listener.run_until(shutdown).await?;

    let cache_stats = cache.stats();
    info!(
        entries = cache_stats.entries,
        hits = cache_stats.hits,
        misses = cache_stats.misses,
        evictions = cache_stats.evictions,
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
