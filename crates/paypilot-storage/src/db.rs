//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

use paypilot_core::PayPilotError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not
/// Sync. Holding the lock for a whole closure makes every closure atomic
/// with respect to other writers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and run pending
    /// migrations.
    pub fn new(path: &Path) -> Result<Self, PayPilotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| PayPilotError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| PayPilotError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, PayPilotError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PayPilotError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| PayPilotError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, PayPilotError>
    where
        F: FnOnce(&Connection) -> Result<T, PayPilotError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PayPilotError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

/// Run a database closure on the blocking thread pool.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, PayPilotError>
where
    F: FnOnce(&Connection) -> Result<T, PayPilotError> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || db.with_conn(f))
        .await
        .map_err(|e| PayPilotError::Storage(format!("Database task failed: {}", e)))?
}

/// Map a rusqlite error into the storage variant.
pub(crate) fn storage_err(e: rusqlite::Error) -> PayPilotError {
    PayPilotError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(db: &Database, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        db.with_conn(|conn| {
            conn.query_row(&sql, [], |row| row.get(0))
                .map_err(storage_err)
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert_eq!(table_count(&db, "invoices"), 0);
        assert_eq!(table_count(&db, "contacts"), 0);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("paypilot.db");
        let db = Database::new(&path).unwrap();
        assert!(path.exists());
        assert_eq!(table_count(&db, "invoices"), 0);
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paypilot.db");
        drop(Database::new(&path).unwrap());
        let db = Database::new(&path).unwrap();
        assert_eq!(table_count(&db, "schema_migrations"), 1);
    }

    #[tokio::test]
    async fn test_blocking_runs_closure() {
        let db = Arc::new(Database::in_memory().unwrap());
        let n: i64 = blocking(&db, |conn| {
            conn.query_row("SELECT 41 + 1", [], |row| row.get(0))
                .map_err(storage_err)
        })
        .await
        .unwrap();
        assert_eq!(n, 42);
    }
}
