//! Command-line interface parsing for the persistcache binary
//!
//! The binary is a small driver around the library: it memoizes a demo
//! `square` function and can invalidate any function's entries in a cache file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::{CacheConfig, DATABASE_ENV, DEFAULT_DATABASE_FILE};

/// Function identifier used by the `square` command
pub const SQUARE_FUNCTION: &str = "persistcache::square";

/// Default TTL of the `square` command, in seconds
pub const DEFAULT_SQUARE_TTL_SECS: u64 = 5;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The log level is not one of off, error, warn, info, debug, trace
    #[error("Invalid log level: '{0}'. Valid levels: off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// persistcache - persistent memoization backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "persistcache")]
#[command(about = "Inspect and exercise a persistent memoization cache")]
#[command(version)]
pub struct Cli {
    /// Path to the cache database
    #[arg(long, global = true, value_name = "PATH")]
    #[arg(env = DATABASE_ENV, default_value = DEFAULT_DATABASE_FILE)]
    pub db: PathBuf,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "LEVEL")]
    #[arg(default_value = "warn", value_parser = parse_log_level)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Square a number through the cache, reporting whether it was recomputed
    Square {
        /// Number to square
        #[arg(allow_hyphen_values = true)]
        value: i64,

        /// Seconds a cached result stays valid
        #[arg(long, value_name = "SECS", default_value_t = DEFAULT_SQUARE_TTL_SECS)]
        ttl: u64,
    },
    /// Remove every cached entry of a function
    Invalidate {
        /// Function identifier, e.g. persistcache::square
        function: String,
    },
}

/// Parses a log level name, case-insensitively
pub fn parse_log_level(s: &str) -> Result<LevelFilter, CliError> {
    s.parse::<LevelFilter>()
        .map_err(|_| CliError::InvalidLogLevel(s.to_string()))
}

impl Cli {
    /// Cache configuration selected by `--db` / `PERSISTCACHE_DB`
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::with_path(self.db.clone())
    }
}
