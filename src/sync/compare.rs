// ABOUTME: Row comparator - counts rows per table locally and remotely
// ABOUTME: Remote failures become a -1 sentinel; local failures abort the comparison

use crate::catalog::TableDescriptor;
use crate::error::{Result, SyncError};
use crate::local::LocalStore;
use crate::remote::RemoteStore;

use super::CompareResult;

/// `remote_count` value for a remote table that is missing or unreadable.
pub const REMOTE_COUNT_UNAVAILABLE: i64 = -1;

/// Count rows of each table on both sides, in the order given.
///
/// A remote count failure (usually a missing table) is expected and
/// recorded as [`REMOTE_COUNT_UNAVAILABLE`]. A local count failure is an
/// environment fault and aborts with [`SyncError::LocalRead`].
pub async fn compare_tables(
    local: &dyn LocalStore,
    remote: &dyn RemoteStore,
    tables: &[TableDescriptor],
) -> Result<Vec<CompareResult>> {
    let mut results = Vec::with_capacity(tables.len());

    for table in tables {
        let local_count = local
            .count_rows(table)
            .map_err(|e| SyncError::local_read(table.name, e))?;

        let remote_count = match remote.count_rows(table.name).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    "Remote count for '{}' unavailable, reporting {}: {:#}",
                    table.name,
                    REMOTE_COUNT_UNAVAILABLE,
                    e
                );
                REMOTE_COUNT_UNAVAILABLE
            }
        };

        tracing::debug!(
            "Compared '{}': local={}, remote={}",
            table.name,
            local_count,
            remote_count
        );

        results.push(CompareResult {
            table_name: table.name.to_string(),
            local_count,
            remote_count,
        });
    }

    Ok(results)
}
