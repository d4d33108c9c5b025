//! Process configuration for the cache
//!
//! The only setting the cache itself needs is where the database file lives.
//! The log level is handled by the binary's subscriber.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the database file
pub const DATABASE_ENV: &str = "PERSISTCACHE_DB";

/// File used when no location is configured, relative to the working directory
pub const DEFAULT_DATABASE_FILE: &str = "cache.db";

/// Configuration for opening the cache store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
        }
    }
}

impl CacheConfig {
    /// Creates a config pointing at a specific database file
    pub fn with_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    /// Reads the database location from `PERSISTCACHE_DB`.
    ///
    /// Falls back to [`DEFAULT_DATABASE_FILE`] when the variable is unset or empty.
    pub fn from_env() -> Self {
        Self::from_value(env::var_os(DATABASE_ENV))
    }

    fn from_value(value: Option<std::ffi::OsString>) -> Self {
        match value {
            Some(path) if !path.is_empty() => Self::with_path(path),
            _ => Self::default(),
        }
    }
}
