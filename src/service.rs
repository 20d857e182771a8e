// ABOUTME: Sync orchestrator - entry points for test-connection, compare and execute
// ABOUTME: Owns the remote handle for the duration of one call and closes it on every path

use std::sync::Arc;

use crate::catalog;
use crate::error::{Result, SyncError};
use crate::local::LocalStore;
use crate::remote::{Connector, DriverConnector, RemoteStore};
use crate::sync::{self, CompareResult, SyncOutcome};
use crate::target::SyncTarget;

/// Drives comparisons and synchronizations against one local store.
///
/// Each call opens its own remote handle, works through tables strictly
/// sequentially on it, and closes it before returning. Concurrent calls
/// against the same target do not coordinate with each other.
#[derive(Clone)]
pub struct SyncService {
    local: Arc<dyn LocalStore>,
    connector: Arc<dyn Connector>,
}

impl SyncService {
    pub fn new(local: Arc<dyn LocalStore>, connector: Arc<dyn Connector>) -> Self {
        Self { local, connector }
    }

    /// Service using the real database drivers.
    pub fn with_drivers(local: Arc<dyn LocalStore>) -> Self {
        Self::new(local, Arc::new(DriverConnector))
    }

    /// Open the target and ping it.
    pub async fn test_connection(&self, target: &SyncTarget) -> Result<()> {
        test_connection(self.connector.as_ref(), target).await
    }

    /// Compare row counts for every catalog table, in catalog order.
    pub async fn compare(&self, target: &SyncTarget) -> Result<Vec<CompareResult>> {
        let remote = self.connector.open(target)?;
        let result = self.compare_on(remote.as_ref()).await;
        remote.close().await;
        result
    }

    async fn compare_on(&self, remote: &dyn RemoteStore) -> Result<Vec<CompareResult>> {
        ping(remote).await?;
        sync::compare_tables(self.local.as_ref(), remote, catalog::tables()).await
    }

    /// Synchronize the requested tables in the order given.
    ///
    /// An empty list is an empty report; the remote is not opened. Unknown
    /// names yield a failed outcome and do not stop the batch. Callers that
    /// pass their own order should list parents before children; see
    /// [`catalog::ordering_warnings`].
    pub async fn execute(
        &self,
        target: &SyncTarget,
        table_names: &[String],
    ) -> Result<Vec<SyncOutcome>> {
        if table_names.is_empty() {
            tracing::info!("No tables requested; nothing to sync");
            return Ok(Vec::new());
        }

        for warning in catalog::ordering_warnings(table_names) {
            tracing::warn!("{}", warning);
        }

        let remote = self.connector.open(target)?;
        let result = self.execute_on(remote.as_ref(), table_names).await;
        remote.close().await;
        result
    }

    async fn execute_on(
        &self,
        remote: &dyn RemoteStore,
        requested: &[String],
    ) -> Result<Vec<SyncOutcome>> {
        ping(remote).await?;

        let mut outcomes = Vec::with_capacity(requested.len());
        for name in requested {
            let outcome = match catalog::find(name) {
                Some(table) => sync::sync_table(self.local.as_ref(), remote, table).await?,
                None => {
                    let err = SyncError::UnknownTable(name.clone());
                    tracing::warn!(
                        "Skipping '{}': {}",
                        crate::utils::sanitize_identifier(name),
                        err
                    );
                    SyncOutcome::failed(name, 0, err.to_string())
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        tracing::info!(
            "Sync finished: {} tables, {} failed",
            outcomes.len(),
            failed
        );

        Ok(outcomes)
    }
}

/// Open the target and ping it without needing a local store.
pub async fn test_connection(connector: &dyn Connector, target: &SyncTarget) -> Result<()> {
    let remote = connector.open(target)?;
    let result = ping(remote.as_ref()).await;
    remote.close().await;
    match &result {
        Ok(()) => tracing::info!("Connection to {} succeeded", target.redacted()),
        Err(e) => tracing::warn!("Connection to {} failed: {}", target.redacted(), e),
    }
    result
}

async fn ping(remote: &dyn RemoteStore) -> Result<()> {
    remote.ping().await.map_err(SyncError::connection)
}
