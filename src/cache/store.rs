//! Record store for cached results
//!
//! Provides the [`RecordStore`] trait the engine talks to and a SQLite
//! implementation. Rows are append-only: writing the same key twice leaves two
//! rows, and lookups pick the newest one.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::CacheError;

/// How long a statement waits on a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cache (
        id INTEGER PRIMARY KEY,
        function TEXT NOT NULL,
        args TEXT NOT NULL,
        result BLOB,
        timestamp INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
    );
    CREATE INDEX IF NOT EXISTS idx_cache_function_args ON cache (function, args);
";

/// A stored payload together with the second it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Encoded result bytes
    pub payload: Vec<u8>,
    /// Seconds since the Unix epoch (UTC), assigned by the store
    pub created_at: i64,
}

/// Persistent table of cache entries keyed by function and argument key
pub trait RecordStore: Send + Sync {
    /// Appends an entry stamped with the current time
    fn insert(&self, function: &str, key: &str, payload: &[u8]) -> Result<(), CacheError>;

    /// Returns the most recent entry for `(function, key)`, if any
    fn lookup(&self, function: &str, key: &str) -> Result<Option<StoredRecord>, CacheError>;

    /// Removes every entry for `(function, key)`, returning how many went away
    fn delete(&self, function: &str, key: &str) -> Result<usize, CacheError>;

    /// Removes every entry for `function`, returning how many went away
    fn delete_all(&self, function: &str) -> Result<usize, CacheError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn insert(&self, function: &str, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        (**self).insert(function, key, payload)
    }

    fn lookup(&self, function: &str, key: &str) -> Result<Option<StoredRecord>, CacheError> {
        (**self).lookup(function, key)
    }

    fn delete(&self, function: &str, key: &str) -> Result<usize, CacheError> {
        (**self).delete(function, key)
    }

    fn delete_all(&self, function: &str) -> Result<usize, CacheError> {
        (**self).delete_all(function)
    }
}

/// SQLite-backed [`RecordStore`]
///
/// A single connection is shared by all callers. `rusqlite::Connection` is not
/// `Sync`, so statements are serialized through a mutex; SQLite's own locking
/// (WAL mode plus a busy timeout) handles other processes using the same file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path` and ensures the cache table exists.
    ///
    /// Safe to call on a database that already has the table.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|source| CacheError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database, mostly useful in tests
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|source| CacheError::Open {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(CacheError::Schema)?;

        // WAL is unavailable on some filesystems; the default journal still works
        if let Err(e) =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        {
            warn!(error = %e, "Could not enable WAL journal mode");
        }

        conn.execute_batch(SCHEMA).map_err(CacheError::Schema)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts a row with an explicit timestamp instead of the store default
    #[cfg(test)]
    pub(crate) fn insert_at(
        &self,
        function: &str,
        key: &str,
        payload: &[u8],
        created_at: i64,
    ) -> Result<(), CacheError> {
        self.conn.lock().execute(
            "INSERT INTO cache (function, args, result, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![function, key, payload, created_at],
        )?;
        Ok(())
    }

    /// Counts rows for `(function, key)`, duplicates included
    #[cfg(test)]
    pub(crate) fn count(&self, function: &str, key: &str) -> Result<usize, CacheError> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM cache WHERE function = ?1 AND args = ?2",
            params![function, key],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl RecordStore for SqliteStore {
    fn insert(&self, function: &str, key: &str, payload: &[u8]) -> Result<(), CacheError> {
        self.conn.lock().execute(
            "INSERT INTO cache (function, args, result) VALUES (?1, ?2, ?3)",
            params![function, key, payload],
        )?;
        Ok(())
    }

    fn lookup(&self, function: &str, key: &str) -> Result<Option<StoredRecord>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT result, timestamp FROM cache
             WHERE function = ?1 AND args = ?2
             ORDER BY timestamp DESC, id DESC
             LIMIT 1",
        )?;

        let record = stmt
            .query_row(params![function, key], |row| {
                Ok(StoredRecord {
                    payload: row.get::<_, Option<Vec<u8>>>(0)?.unwrap_or_default(),
                    created_at: row.get(1)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    fn delete(&self, function: &str, key: &str) -> Result<usize, CacheError> {
        let removed = self.conn.lock().execute(
            "DELETE FROM cache WHERE function = ?1 AND args = ?2",
            params![function, key],
        )?;
        Ok(removed)
    }

    fn delete_all(&self, function: &str) -> Result<usize, CacheError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM cache WHERE function = ?1", params![function])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            SqliteStore::open(&temp_dir.path().join("cache.db")).expect("Store should open");
        (store, temp_dir)
    }

    #[test]
    fn test_open_creates_database_file() {
        let (_store, temp_dir) = create_test_store();
        assert!(temp_dir.path().join("cache.db").exists(), "Database file should exist");
    }

    #[test]
    fn test_open_is_idempotent_on_existing_schema() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("cache.db");

        let first = SqliteStore::open(&path).expect("First open should succeed");
        first.insert("f", "k", b"1").expect("Insert should succeed");
        drop(first);

        let second = SqliteStore::open(&path).expect("Reopen should succeed");
        let record = second.lookup("f", "k").expect("Lookup should succeed");
        assert_eq!(record.map(|r| r.payload), Some(b"1".to_vec()));
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing").join("cache.db");

        let result = SqliteStore::open(&path);
        assert!(matches!(result, Err(CacheError::Open { .. })));
    }

    #[test]
    fn test_lookup_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.lookup("f", "absent").expect("Lookup should succeed").is_none());
    }

    #[test]
    fn test_insert_stamps_current_time() {
        let (store, _temp_dir) = create_test_store();

        let before = Utc::now().timestamp();
        store.insert("f", "k", b"payload").expect("Insert should succeed");
        let after = Utc::now().timestamp();

        let record = store
            .lookup("f", "k")
            .expect("Lookup should succeed")
            .expect("Row should exist");
        assert_eq!(record.payload, b"payload".to_vec());
        assert!(record.created_at >= before && record.created_at <= after);
    }

    #[test]
    fn test_duplicate_rows_resolve_to_most_recent() {
        let store = SqliteStore::open_in_memory().expect("Store should open");
        store.insert_at("f", "k", b"new", 200).expect("Insert should succeed");
        store.insert_at("f", "k", b"old", 100).expect("Insert should succeed");

        let record = store
            .lookup("f", "k")
            .expect("Lookup should succeed")
            .expect("Row should exist");
        assert_eq!(record.payload, b"new".to_vec());
        assert_eq!(record.created_at, 200);
        assert_eq!(store.count("f", "k").expect("Count should succeed"), 2);
    }

    #[test]
    fn test_same_second_duplicates_prefer_last_insert() {
        let store = SqliteStore::open_in_memory().expect("Store should open");
        store.insert_at("f", "k", b"first", 100).expect("Insert should succeed");
        store.insert_at("f", "k", b"second", 100).expect("Insert should succeed");

        let record = store
            .lookup("f", "k")
            .expect("Lookup should succeed")
            .expect("Row should exist");
        assert_eq!(record.payload, b"second".to_vec());
    }

    #[test]
    fn test_delete_removes_only_matching_key() {
        let (store, _temp_dir) = create_test_store();
        store.insert("f", "a", b"1").expect("Insert should succeed");
        store.insert("f", "a", b"1").expect("Insert should succeed");
        store.insert("f", "b", b"2").expect("Insert should succeed");

        assert_eq!(store.delete("f", "a").expect("Delete should succeed"), 2);
        assert!(store.lookup("f", "a").expect("Lookup should succeed").is_none());
        assert!(store.lookup("f", "b").expect("Lookup should succeed").is_some());
    }

    #[test]
    fn test_delete_all_is_scoped_to_function() {
        let (store, _temp_dir) = create_test_store();
        store.insert("square", "1", b"1").expect("Insert should succeed");
        store.insert("square", "2", b"4").expect("Insert should succeed");
        store.insert("cube", "2", b"8").expect("Insert should succeed");

        assert_eq!(store.delete_all("square").expect("Delete should succeed"), 2);
        assert!(store.lookup("square", "2").expect("Lookup should succeed").is_none());
        assert!(store.lookup("cube", "2").expect("Lookup should succeed").is_some());
    }
}
