//! Server Configuration
//!
//! Startup constants for the cache server and the command-line parsing that
//! overrides them. Everything here is read once at startup; nothing is
//! reloaded while the server runs.

use crate::protocol::Protocol;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// The default port the server listens on.
pub const DEFAULT_PORT: u16 = 7171;

/// The default host the server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Errors produced while building or validating a [`Config`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Shard count is zero or not a power of two
    #[error("shard count must be a non-zero power of two, got {0}")]
    ShardCount(usize),

    /// A size or count that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// More concurrent connections than the admission semaphore can count
    #[error("max connections {0} exceeds the limit of {max}", max = Semaphore::MAX_PERMITS)]
    TooManyConnections(usize),

    /// The frame limit cannot hold one maximal request
    #[error("max frame size {frame} is too small for {len}-byte keys and values")]
    FrameTooSmall { frame: usize, len: usize },

    /// A flag was given without its value
    #[error("{0} requires a value")]
    MissingValue(String),

    /// A flag value failed to parse
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    /// The protocol name is neither `line` nor `resp`
    #[error("unknown protocol '{0}' (expected 'line' or 'resp')")]
    UnknownProtocol(String),

    /// Unrecognized command-line argument
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Wire protocol spoken on every connection
    pub protocol: Protocol,
    /// Number of LRU shards, a power of two
    pub shard_count: usize,
    /// Entries per shard before eviction
    pub capacity_per_shard: usize,
    /// Longest key or value a PUT may carry, in bytes
    pub max_key_value_len: usize,
    /// Connections served at once; further clients wait in the backlog
    pub max_connections: usize,
    /// Socket receive buffer and initial read buffer size
    pub read_buffer_size: usize,
    /// Socket send buffer and pooled response buffer size
    pub write_buffer_size: usize,
    /// TCP keep-alive probe interval
    pub keepalive_interval: Duration,
    /// Largest partial frame a connection may buffer before it is dropped
    pub max_frame_size: usize,
    /// Idle response buffers kept for reuse
    pub buffer_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Line,
            shard_count: 16,
            capacity_per_shard: 20_000,
            max_key_value_len: 256,
            max_connections: 10_000,
            read_buffer_size: 4096,
            write_buffer_size: 4096,
            keepalive_interval: Duration::from_secs(30),
            max_frame_size: 64 * 1024,
            buffer_pool_size: 1024,
        }
    }
}

/// What the command line asked the binary to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsOutcome {
    /// Start the server with this configuration
    Run(Config),
    /// Print usage and exit
    Help,
    /// Print the version and exit
    Version,
}

impl Config {
    /// Parses command-line arguments (without the program name) on top of the
    /// defaults, then validates the result.
    pub fn from_args<I>(args: I) -> Result<ArgsOutcome, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => config.host = next_value(&arg, &mut args)?,
                "--port" | "-p" => config.port = parse_value(&arg, &mut args)?,
                "--protocol" => {
                    let name: String = next_value(&arg, &mut args)?;
                    config.protocol = Protocol::from_name(&name)
                        .ok_or(ConfigError::UnknownProtocol(name))?;
                }
                "--shards" => config.shard_count = parse_value(&arg, &mut args)?,
                "--capacity" => config.capacity_per_shard = parse_value(&arg, &mut args)?,
                "--max-value-len" => config.max_key_value_len = parse_value(&arg, &mut args)?,
                "--max-connections" => config.max_connections = parse_value(&arg, &mut args)?,
                "--buffer-size" => {
                    let size = parse_value(&arg, &mut args)?;
                    config.read_buffer_size = size;
                    config.write_buffer_size = size;
                }
                "--help" => return Ok(ArgsOutcome::Help),
                "--version" | "-v" => return Ok(ArgsOutcome::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        config.validate()?;
        Ok(ArgsOutcome::Run(config))
    }

    /// Checks the invariants the cache and connection layer rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.shard_count.is_power_of_two() {
            return Err(ConfigError::ShardCount(self.shard_count));
        }

        let positive = [
            (self.capacity_per_shard, "capacity per shard"),
            (self.max_key_value_len, "max key/value length"),
            (self.max_connections, "max connections"),
            (self.read_buffer_size, "read buffer size"),
            (self.write_buffer_size, "write buffer size"),
        ];
        if let Some((_, name)) = positive.iter().find(|(value, _)| *value == 0) {
            return Err(ConfigError::Zero(*name));
        }

        if self.max_connections > Semaphore::MAX_PERMITS {
            return Err(ConfigError::TooManyConnections(self.max_connections));
        }

        // Room for a RESP PUT with a maximal key and value plus headers
        if self.max_frame_size < self.max_key_value_len * 2 + 64 {
            return Err(ConfigError::FrameTooSmall {
                frame: self.max_frame_size,
                len: self.max_key_value_len,
            });
        }

        Ok(())
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn next_value(flag: &str, args: &mut impl Iterator<Item = String>) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: FromStr>(
    flag: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<T, ConfigError> {
    let value = next_value(flag, args)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}
