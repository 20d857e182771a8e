// ABOUTME: Remote database access for the sync engine (MySQL and PostgreSQL)
// ABOUTME: Defines the RemoteStore/Connector seams and the driver-backed connector

pub mod mysql;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::SyncError;
use crate::target::SyncTarget;
use crate::value::{PrimaryKey, SqlValue};

pub use mysql::MySqlStore;
pub use postgres::PostgresStore;

/// An open handle to the remote database.
///
/// Handles are lazy: nothing touches the network until the first call.
/// The caller owns the handle and must call [`RemoteStore::close`] when done.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Force a round-trip to the server.
    async fn ping(&self) -> Result<()>;

    async fn count_rows(&self, table: &str) -> Result<i64>;

    /// Execute a prebuilt upsert statement with positional values.
    async fn upsert_row(&self, table: &str, statement: &str, values: &[SqlValue]) -> Result<u64>;

    /// Every primary key currently stored in `table`.
    async fn primary_keys(&self, table: &str, primary_key: &str) -> Result<Vec<PrimaryKey>>;

    /// Delete the given keys in one statement. Callers chunk the key list.
    async fn delete_keys(&self, table: &str, primary_key: &str, keys: &[PrimaryKey])
        -> Result<u64>;

    async fn delete_all(&self, table: &str) -> Result<u64>;

    /// Release the handle. Errors while closing are logged, not returned.
    async fn close(&self);
}

/// Opens remote handles from a target description.
pub trait Connector: Send + Sync {
    fn open(&self, target: &SyncTarget) -> Result<Box<dyn RemoteStore>, SyncError>;
}

/// Connector backed by the real `tokio-postgres` and `mysql_async` drivers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverConnector;

impl Connector for DriverConnector {
    fn open(&self, target: &SyncTarget) -> Result<Box<dyn RemoteStore>, SyncError> {
        let dialect = target.validate()?;
        let dsn = target.dsn()?;
        let tls_mode = target.effective_tls_mode(dialect);

        tracing::debug!(
            "Opening {} handle to {} (tls: {})",
            dialect,
            target.redacted(),
            tls_mode.as_str()
        );

        match dialect {
            Dialect::Postgres => {
                let store = PostgresStore::new(&dsn, tls_mode).map_err(SyncError::connection)?;
                Ok(Box::new(store))
            }
            Dialect::MySql => {
                let store = MySqlStore::new(&dsn, tls_mode).map_err(SyncError::connection)?;
                Ok(Box::new(store))
            }
        }
    }
}
