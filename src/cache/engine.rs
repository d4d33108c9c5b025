//! Cache engine: expiration-on-read over a [`RecordStore`]
//!
//! The engine never reports failures upward. Lookups that fail, hit an expired
//! row or cannot decode their payload all come back as `None`; writes that fail
//! are logged and dropped. A broken cache therefore behaves like no cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cache::codec::{Codec, JsonCodec};
use crate::cache::store::{RecordStore, SqliteStore};
use crate::config::CacheConfig;
use crate::error::CacheError;

/// Process-wide engine, created on first use
static GLOBAL_ENGINE: OnceCell<Arc<CacheEngine>> = OnceCell::new();

/// Owns a record store and applies TTLs and the codec on top of it
pub struct CacheEngine<C: Codec = JsonCodec> {
    store: Box<dyn RecordStore>,
    codec: C,
}

impl CacheEngine<JsonCodec> {
    /// Opens the SQLite store described by `config`
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        debug!(path = %config.database_path.display(), "Opening persistent cache");
        let store = SqliteStore::open(&config.database_path)?;
        Ok(Self::new(store))
    }

    /// Builds an engine over an existing store using the JSON codec
    pub fn new(store: impl RecordStore + 'static) -> Self {
        Self::with_codec(store, JsonCodec)
    }
}

impl<C: Codec> CacheEngine<C> {
    /// Builds an engine over an existing store and codec
    pub fn with_codec(store: impl RecordStore + 'static, codec: C) -> Self {
        Self {
            store: Box::new(store),
            codec,
        }
    }

    /// Returns the cached value for `(function, key)` if one exists and is younger than `ttl`.
    ///
    /// Expired rows are deleted on the way out. Rows that fail to decode are
    /// left in place and reported as a miss.
    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        function: &str,
        key: &str,
        ttl: Duration,
    ) -> Option<T> {
        let record = match self.store.lookup(function, key) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                debug!(function, key, error = %e, "Cache lookup error");
                return None;
            }
        };

        if is_expired(record.created_at, ttl, Utc::now()) {
            debug!(function, key, created_at = record.created_at, "Cache entry expired");
            if let Err(e) = self.store.delete(function, key) {
                debug!(function, key, error = %e, "Cache delete error");
            }
            return None;
        }

        match self.codec.decode(&record.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(function, key, error = %e, "Deserialization error");
                None
            }
        }
    }

    /// Stores `value` under `(function, key)`; failures are logged and ignored
    pub(crate) fn set<T: Serialize + ?Sized>(&self, function: &str, key: &str, value: &T) {
        let payload = match self.codec.encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(function, key, error = %e, "Serialization error");
                return;
            }
        };

        if let Err(e) = self.store.insert(function, key, &payload) {
            debug!(function, key, error = %e, "Cache set error");
        }
    }

    /// Drops every entry recorded for `function`
    pub fn invalidate(&self, function: &str) {
        match self.store.delete_all(function) {
            Ok(removed) => debug!(function, removed, "Cache invalidated"),
            Err(e) => debug!(function, error = %e, "Cache delete error"),
        }
    }
}

/// An entry written at `created_at` (epoch seconds) expires at `created_at + ttl`.
///
/// A TTL too large to represent never expires; an unreadable timestamp always has.
fn is_expired(created_at: i64, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(created) = DateTime::<Utc>::from_timestamp(created_at, 0) else {
        return true;
    };

    match chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created.checked_add_signed(ttl))
    {
        Some(expires_at) => now >= expires_at,
        None => false,
    }
}

/// Explicitly creates the process-wide engine from `config`.
///
/// Returns [`CacheError::AlreadyInitialized`] if the engine already exists,
/// whether it came from an earlier `init` or from lazy creation in [`global`].
pub fn init(config: &CacheConfig) -> Result<Arc<CacheEngine>, CacheError> {
    let mut created = false;
    let engine = GLOBAL_ENGINE.get_or_try_init(|| {
        created = true;
        CacheEngine::open(config).map(Arc::new)
    })?;

    if !created {
        return Err(CacheError::AlreadyInitialized);
    }
    Ok(Arc::clone(engine))
}

/// Returns the process-wide engine, opening it from [`CacheConfig::from_env`] on first use.
///
/// Concurrent first callers block until one of them has finished opening the
/// store; exactly one store is ever created.
///
/// # Panics
///
/// Panics if the store cannot be opened or its schema cannot be created. The
/// cache has no degraded mode without storage; use [`init`] to handle this as
/// an error at startup instead.
pub fn global() -> Arc<CacheEngine> {
    let engine = GLOBAL_ENGINE.get_or_init(|| {
        let config = CacheConfig::from_env();
        debug!(path = %config.database_path.display(), "Creating process-wide cache engine");
        match CacheEngine::open(&config) {
            Ok(engine) => Arc::new(engine),
            Err(e) => panic!("persistent cache unavailable: {e}"),
        }
    });
    Arc::clone(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::thread;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Forecast {
        city: String,
        high: i32,
    }

    fn create_test_engine() -> (Arc<SqliteStore>, CacheEngine, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(
            SqliteStore::open(&temp_dir.path().join("cache.db")).expect("Store should open"),
        );
        let engine = CacheEngine::new(Arc::clone(&store));
        (store, engine, temp_dir)
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_get_returns_none_for_missing_entry() {
        let (_store, engine, _temp_dir) = create_test_engine();
        assert_eq!(engine.get::<i32>("f", "k", HOUR), None);
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let (_store, engine, _temp_dir) = create_test_engine();
        let forecast = Forecast {
            city: "Oslo".to_string(),
            high: 12,
        };

        engine.set("forecast", "oslo", &forecast);

        assert_eq!(engine.get::<Forecast>("forecast", "oslo", HOUR), Some(forecast));
    }

    #[test]
    fn test_expired_entry_is_deleted_on_read() {
        let (store, engine, _temp_dir) = create_test_engine();
        let stale = Utc::now().timestamp() - 120;
        store.insert_at("f", "k", b"5", stale).expect("Insert should succeed");

        assert_eq!(engine.get::<i32>("f", "k", Duration::from_secs(60)), None);
        assert_eq!(store.count("f", "k").expect("Count should succeed"), 0);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let (store, engine, _temp_dir) = create_test_engine();
        engine.set("f", "k", &7);

        assert_eq!(engine.get::<i32>("f", "k", Duration::ZERO), None);
        assert_eq!(store.count("f", "k").expect("Count should succeed"), 0);
    }

    #[test]
    fn test_entry_expires_after_ttl_elapses() {
        let (_store, engine, _temp_dir) = create_test_engine();
        let ttl = Duration::from_secs(2);
        engine.set("f", "k", &7);
        assert_eq!(engine.get::<i32>("f", "k", ttl), Some(7));

        // Timestamps are whole seconds, so wait out the full TTL plus margin
        thread::sleep(Duration::from_millis(2100));

        assert_eq!(engine.get::<i32>("f", "k", ttl), None);
    }

    #[test]
    fn test_undecodable_entry_is_a_miss_but_kept() {
        let (store, engine, _temp_dir) = create_test_engine();
        engine.set("f", "k", &"text");

        assert_eq!(engine.get::<u64>("f", "k", HOUR), None);
        assert_eq!(store.count("f", "k").expect("Count should succeed"), 1);
    }

    #[test]
    fn test_unencodable_value_is_not_written() {
        let (store, engine, _temp_dir) = create_test_engine();
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "pair");

        engine.set("f", "k", &map);

        assert_eq!(store.count("f", "k").expect("Count should succeed"), 0);
    }

    #[test]
    fn test_invalidate_leaves_other_functions() {
        let (_store, engine, _temp_dir) = create_test_engine();
        engine.set("square", "2", &4);
        engine.set("cube", "2", &8);

        engine.invalidate("square");

        assert_eq!(engine.get::<i32>("square", "2", HOUR), None);
        assert_eq!(engine.get::<i32>("cube", "2", HOUR), Some(8));
    }

    #[test]
    fn test_is_expired_boundaries() {
        let now = Utc::now();
        let created = now.timestamp() - 10;

        assert!(is_expired(created, Duration::from_secs(10), now));
        assert!(!is_expired(created, Duration::from_secs(11), now));
        assert!(!is_expired(created, Duration::MAX, now));
        assert!(is_expired(i64::MAX, Duration::from_secs(1), now));
    }

    #[test]
    fn test_engines_are_shared_across_threads() {
        let (_store, engine, _temp_dir) = create_test_engine();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine.set("f", &i.to_string(), &(i * i));
                    engine.get::<i32>("f", &i.to_string(), HOUR)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let i = i as i32;
            assert_eq!(handle.join().expect("Thread should not panic"), Some(i * i));
        }
    }
}
