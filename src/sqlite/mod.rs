// ABOUTME: SQLite local store, the offline system of record read by the sync engine
// ABOUTME: Opens the desktop database read-only and serves counts and rows per catalog table

pub mod reader;

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;

use crate::catalog::{self, TableDescriptor};
use crate::local::LocalStore;
use crate::value::Row;

pub use reader::{get_table_row_count, list_tables, read_table_rows};

/// Open a SQLite database in read-only mode.
///
/// The sync engine never writes to the local store, so the file is opened
/// with `SQLITE_OPEN_READ_ONLY`. A missing file is an error rather than
/// silently creating an empty database.
pub fn open_sqlite(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!(
            "SQLite database not found at '{}'. Set --local-db or DB_PATH",
            path.display()
        );
    }
    if !path.is_file() {
        bail!("'{}' is not a file", path.display());
    }

    tracing::info!("Opening local SQLite database: {}", path.display());

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open SQLite database '{}'", path.display()))?;

    Ok(conn)
}

/// [`LocalStore`] backed by one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::from_connection(open_sqlite(path)?);
        store.warn_missing_tables()?;
        Ok(store)
    }

    /// Wrap an already opened connection (used for in-memory databases).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Catalog tables that do not exist in the local database.
    pub fn missing_tables(&self) -> Result<Vec<&'static str>> {
        let present = self.with_conn(list_tables)?;
        Ok(catalog::table_names()
            .into_iter()
            .filter(|name| !present.iter().any(|p| p.as_str() == *name))
            .collect())
    }

    fn warn_missing_tables(&self) -> Result<()> {
        let missing = self.missing_tables()?;
        if !missing.is_empty() {
            tracing::warn!(
                "Local database is missing catalog tables: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Local database connection lock poisoned"))?;
        f(&conn)
    }
}

impl LocalStore for SqliteStore {
    fn count_rows(&self, table: &TableDescriptor) -> Result<i64> {
        self.with_conn(|conn| get_table_row_count(conn, table.name))
    }

    fn read_rows(&self, table: &TableDescriptor) -> Result<Vec<Row>> {
        self.with_conn(|conn| read_table_rows(conn, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sqlite_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = open_sqlite(&temp_dir.path().join("nope.db"));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_open_sqlite_rejects_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(open_sqlite(temp_dir.path()).is_err());
    }

    #[test]
    fn test_open_is_read_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("orange.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .unwrap();

        let conn = open_sqlite(&db_path).unwrap();
        assert!(conn.execute("INSERT INTO users (id) VALUES (1)", []).is_err());
    }

    #[test]
    fn test_store_counts_and_reports_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE user_notifications (
                id INTEGER PRIMARY KEY,
                user_id INTEGER,
                notification_id INTEGER,
                is_read INTEGER,
                read_time DATETIME
            );
            INSERT INTO user_notifications VALUES (1, 1, 1, 0, NULL);
            INSERT INTO user_notifications VALUES (2, 1, 2, 1, '2024-06-01 12:00:00+08:00');",
        )
        .unwrap();
        let store = SqliteStore::from_connection(conn);
        let table = catalog::find("user_notifications").unwrap();

        assert_eq!(store.count_rows(table).unwrap(), 2);
        assert_eq!(store.read_rows(table).unwrap().len(), 2);
        let missing = store.missing_tables().unwrap();
        assert_eq!(missing.len(), 7);
        assert!(!missing.contains(&"user_notifications"));
        assert!(store.count_rows(catalog::find("users").unwrap()).is_err());
    }
}
