//! Error types for the persistent cache
//!
//! Startup errors (open/schema) are the only ones a caller can ever see, and
//! only through [`crate::cache::init`]. Everything else is logged and turned
//! into a cache miss or a skipped write inside the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the store, the codec and key derivation
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing database file could not be opened or created
    #[error("Failed to open cache store at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The cache table could not be created or verified
    #[error("Failed to ensure cache schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// A statement against an open store failed
    #[error("Cache store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A result value could not be encoded
    #[error("Serialization error: {0}")]
    Encode(String),

    /// A stored payload could not be decoded into the requested type
    #[error("Deserialization error: {0}")]
    Decode(String),

    /// A call argument could not be rendered into a cache key
    #[error("Argument key error: {0}")]
    Key(String),

    /// `init` was called after the process-wide engine already existed
    #[error("Cache engine already initialized")]
    AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_mentions_path() {
        let err = CacheError::Open {
            path: PathBuf::from("/nowhere/cache.db"),
            source: rusqlite::Error::InvalidQuery,
        };
        let message = err.to_string();
        assert!(message.contains("/nowhere/cache.db"));
        assert!(message.contains("Failed to open"));
    }

    #[test]
    fn test_store_error_converts_from_rusqlite() {
        let err: CacheError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, CacheError::Store(_)));
    }
}
