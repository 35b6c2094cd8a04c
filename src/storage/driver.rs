//! C1: typed wrapper over the SQLite backend — connection pooling,
//! statement execution, duplicate-key signalling, table-exists probes.
//!
//! Mirrors the teacher's `SqliteCatalogStore`: one writer connection behind
//! a mutex (SQLite only allows a single writer), a small round-robin pool of
//! reader connections for concurrent read load.

use crate::errors::{H2hDbError, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the database. Cheap to clone; internals are `Arc`.
#[derive(Clone)]
pub struct StorageDriver {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
}

const DEFAULT_READ_POOL_SIZE: usize = 4;

impl StorageDriver {
    /// Open (or create) the database file at `path`, with a pool of reader
    /// connections alongside the single writer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_read_pool_size(path, DEFAULT_READ_POOL_SIZE)
    }

    pub fn open_with_read_pool_size(
        path: impl AsRef<Path>,
        read_pool_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let write_conn = Connection::open(path)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let conn = Connection::open(path)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "query_only", "ON")?;
            read_pool.push(Arc::new(Mutex::new(conn)));
        }

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Open an in-memory database, for tests. Reads and writes share the
    /// same connection since `:memory:` databases are not shared across
    /// connections.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let shared = Arc::new(Mutex::new(conn));
        Ok(Self {
            write_conn: shared.clone(),
            read_pool: vec![shared],
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Acquire the single writer connection. Every write statement in this
    /// crate is autocommit (no cross-statement transactions), per the
    /// design's atomicity-by-tombstone choice.
    pub fn writer(&self) -> MutexGuard<'_, Connection> {
        self.write_conn.lock().expect("write connection poisoned")
    }

    /// Acquire a reader connection, round-robin across the pool.
    pub fn reader(&self) -> MutexGuard<'_, Connection> {
        let idx = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[idx].lock().expect("read connection poisoned")
    }

    /// Run `f` inside an explicit transaction on the writer connection. Used
    /// sparingly — the design's policy is autocommit-by-default; this exists
    /// for the batched temp-table operations in the scanner (§4.7).
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Probe whether a table exists.
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.reader();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Execute a write statement, converting a unique-constraint violation
    /// into `DuplicateKey` rather than a generic SQLite error.
    pub fn execute_signalling_duplicates(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<usize> {
        let conn = self.writer();
        conn.execute(sql, params).map_err(|err| {
            if H2hDbError::is_duplicate_key(&err) {
                H2hDbError::DuplicateKey
            } else {
                H2hDbError::Sqlite(err)
            }
        })
    }

    /// `SELECT` a single row, converting "no rows" into `NotFound`.
    pub fn query_row_or_not_found<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        f: impl FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.reader();
        conn.query_row(sql, params, f)
            .optional()?
            .ok_or(H2hDbError::NotFound)
    }

    /// Validate the database-wide settings the design requires. SQLite's
    /// closest equivalent to "charset = utf8mb4, collation = utf8mb4_bin" is
    /// `PRAGMA encoding = 'UTF-8'` plus the implicit binary default collation
    /// on TEXT columns (we never declare `COLLATE NOCASE`).
    pub fn check_database_settings(&self) -> Result<()> {
        let conn = self.reader();
        let encoding: String = conn.query_row("PRAGMA encoding", [], |row| row.get(0))?;
        if encoding.to_ascii_uppercase() != "UTF-8" {
            return Err(H2hDbError::Config(format!(
                "database encoding must be UTF-8, got {encoding}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_exists_reflects_creation() {
        let driver = StorageDriver::open_in_memory().unwrap();
        assert!(!driver.table_exists("widgets").unwrap());
        driver
            .writer()
            .execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        assert!(driver.table_exists("widgets").unwrap());
    }

    #[test]
    fn duplicate_key_is_signalled() {
        let driver = StorageDriver::open_in_memory().unwrap();
        driver
            .writer()
            .execute(
                "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT UNIQUE)",
                [],
            )
            .unwrap();
        driver
            .execute_signalling_duplicates(
                "INSERT INTO widgets (id, name) VALUES (1, 'a')",
                [],
            )
            .unwrap();
        let result = driver.execute_signalling_duplicates(
            "INSERT INTO widgets (id, name) VALUES (2, 'a')",
            [],
        );
        assert!(matches!(result, Err(H2hDbError::DuplicateKey)));
    }

    #[test]
    fn database_settings_pass_by_default() {
        let driver = StorageDriver::open_in_memory().unwrap();
        driver.check_database_settings().unwrap();
    }
}
