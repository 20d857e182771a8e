// ABOUTME: Table synchronizer - pushes one local table to the remote and prunes stale rows
// ABOUTME: Upsert failures fail the table; cleanup failures are logged and tolerated

use std::collections::HashSet;

use crate::catalog::TableDescriptor;
use crate::error::{Result, SyncError};
use crate::local::LocalStore;
use crate::query::{self, DELETE_BATCH_SIZE};
use crate::remote::RemoteStore;
use crate::value::PrimaryKey;

use super::SyncOutcome;

/// Synchronize one table: upsert every local row, then delete remote rows
/// whose primary key no longer exists locally.
///
/// Per-table faults are folded into the returned [`SyncOutcome`]. The only
/// error returned is [`SyncError::LocalRead`], which the caller treats as
/// fatal for the whole run.
pub async fn sync_table(
    local: &dyn LocalStore,
    remote: &dyn RemoteStore,
    table: &TableDescriptor,
) -> Result<SyncOutcome> {
    tracing::info!("Syncing table '{}'", table.name);

    let rows = local
        .read_rows(table)
        .map_err(|e| SyncError::local_read(table.name, e))?;

    let statement = query::build_upsert(
        table.name,
        &table.column_names(),
        table.primary_key,
        remote.dialect(),
    );
    tracing::debug!("Upsert statement for '{}': {}", table.name, statement);

    let pk_index = table.primary_key_index();
    let mut retained: HashSet<PrimaryKey> = HashSet::with_capacity(rows.len());
    let mut unkeyed = 0usize;
    let mut synced_count: i64 = 0;

    for row in &rows {
        if let Err(e) = remote.upsert_row(table.name, &statement, row).await {
            let err = SyncError::row_upsert(table.name, e);
            tracing::error!("{}", err);
            tracing::info!(
                "Table '{}' aborted after {} of {} rows",
                table.name,
                synced_count,
                rows.len()
            );
            return Ok(SyncOutcome::failed(table.name, synced_count, err.to_string()));
        }
        synced_count += 1;
        match row.get(pk_index).and_then(PrimaryKey::from_value) {
            Some(key) => {
                retained.insert(key);
            }
            None => unkeyed += 1,
        }
    }

    let mut deleted_count = 0;
    if unkeyed > 0 {
        // remote keys cannot be matched against these rows
        tracing::warn!(
            "Skipping stale row cleanup for '{}': {} rows have a '{}' value that is not an integer or text key",
            table.name,
            unkeyed,
            table.primary_key
        );
    } else if let Err(e) =
        remove_stale_rows(remote, table, rows.len(), &retained, &mut deleted_count).await
    {
        tracing::warn!("{}", SyncError::row_delete(table.name, e));
    }

    tracing::info!(
        "Synced table '{}': {} rows upserted, {} stale rows deleted",
        table.name,
        synced_count,
        deleted_count
    );

    Ok(SyncOutcome::succeeded(
        table.name,
        synced_count,
        deleted_count,
    ))
}

/// Delete remote rows whose key is not in `retained`.
///
/// No local rows clears the table. Otherwise the stale keys are
/// computed in memory and deleted in chunks of [`DELETE_BATCH_SIZE`];
/// the first failing chunk stops the cleanup. `deleted` counts rows
/// removed before any failure.
async fn remove_stale_rows(
    remote: &dyn RemoteStore,
    table: &TableDescriptor,
    local_rows: usize,
    retained: &HashSet<PrimaryKey>,
    deleted: &mut u64,
) -> anyhow::Result<()> {
    if local_rows == 0 {
        *deleted += remote.delete_all(table.name).await?;
        return Ok(());
    }

    let remote_keys = remote.primary_keys(table.name, table.primary_key).await?;
    let stale: Vec<PrimaryKey> = remote_keys
        .into_iter()
        .filter(|key| !retained.contains(key))
        .collect();

    if stale.is_empty() {
        return Ok(());
    }

    tracing::info!(
        "Found {} stale rows in remote table '{}'",
        stale.len(),
        table.name
    );

    for chunk in stale.chunks(DELETE_BATCH_SIZE) {
        *deleted += remote
            .delete_keys(table.name, table.primary_key, chunk)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::dialect::Dialect;
    use crate::value::{Row, SqlValue};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct Rows(Vec<Row>);

    impl LocalStore for Rows {
        fn count_rows(&self, _table: &TableDescriptor) -> anyhow::Result<i64> {
            Ok(self.0.len() as i64)
        }

        fn read_rows(&self, _table: &TableDescriptor) -> anyhow::Result<Vec<Row>> {
            Ok(self.0.clone())
        }
    }

    struct Unreadable;

    impl LocalStore for Unreadable {
        fn count_rows(&self, _table: &TableDescriptor) -> anyhow::Result<i64> {
            anyhow::bail!("disk I/O error")
        }

        fn read_rows(&self, _table: &TableDescriptor) -> anyhow::Result<Vec<Row>> {
            anyhow::bail!("disk I/O error")
        }
    }

    /// Remote keyed by id; records delete chunk sizes.
    #[derive(Default)]
    struct Remote {
        rows: Mutex<BTreeMap<i64, Row>>,
        fail_upsert_at: Option<i64>,
        fail_deletes: bool,
        delete_chunks: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RemoteStore for Remote {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn count_rows(&self, _table: &str) -> anyhow::Result<i64> {
            Ok(self.rows.lock().unwrap().len() as i64)
        }

        async fn upsert_row(
            &self,
            _table: &str,
            statement: &str,
            values: &[SqlValue],
        ) -> anyhow::Result<u64> {
            assert!(statement.contains("ON CONFLICT (id)"));
            let id = match values[0] {
                SqlValue::Integer(id) => id,
                // integer column rounds a fractional key
                SqlValue::Real(v) => v.round() as i64,
                _ => anyhow::bail!("bad id"),
            };
            if self.fail_upsert_at == Some(id) {
                anyhow::bail!("duplicate key value violates unique constraint");
            }
            self.rows.lock().unwrap().insert(id, values.to_vec());
            Ok(1)
        }

        async fn primary_keys(
            &self,
            _table: &str,
            _primary_key: &str,
        ) -> anyhow::Result<Vec<PrimaryKey>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .keys()
                .map(|id| PrimaryKey::parse(&id.to_string()))
                .collect())
        }

        async fn delete_keys(
            &self,
            _table: &str,
            _primary_key: &str,
            keys: &[PrimaryKey],
        ) -> anyhow::Result<u64> {
            if self.fail_deletes {
                anyhow::bail!("violates foreign key constraint");
            }
            self.delete_chunks.lock().unwrap().push(keys.len());
            let mut rows = self.rows.lock().unwrap();
            let mut deleted = 0;
            for key in keys {
                if let PrimaryKey::Integer(id) = key {
                    if rows.remove(id).is_some() {
                        deleted += 1;
                    }
                }
            }
            Ok(deleted)
        }

        async fn delete_all(&self, _table: &str) -> anyhow::Result<u64> {
            if self.fail_deletes {
                anyhow::bail!("violates foreign key constraint");
            }
            let mut rows = self.rows.lock().unwrap();
            let count = rows.len() as u64;
            rows.clear();
            Ok(count)
        }

        async fn close(&self) {}
    }

    fn row(id: i64, name: &str) -> Row {
        let table = catalog::find("dictionaries").unwrap();
        let mut values = vec![SqlValue::Null; table.columns.len()];
        values[0] = SqlValue::Integer(id);
        values[2] = SqlValue::Text(name.to_string());
        values
    }

    fn remote_with(ids: &[i64]) -> Remote {
        let remote = Remote::default();
        for id in ids {
            remote
                .rows
                .lock()
                .unwrap()
                .insert(*id, row(*id, "remote"));
        }
        remote
    }

    fn remote_ids(remote: &Remote) -> Vec<i64> {
        remote.rows.lock().unwrap().keys().copied().collect()
    }

    #[tokio::test]
    async fn test_sync_table_removes_stale_rows() {
        let local = Rows(vec![row(1, "a"), row(2, "b")]);
        let remote = remote_with(&[1, 2, 3]);
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&local, &remote, table).await.unwrap();

        assert_eq!(outcome, SyncOutcome::succeeded("dictionaries", 2, 1));
        assert_eq!(remote_ids(&remote), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_sync_table_empty_local_clears_remote() {
        let remote = remote_with(&[1, 2, 3]);
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&Rows(vec![]), &remote, table).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.synced_count, 0);
        assert_eq!(outcome.deleted_count, 3);
        assert!(remote_ids(&remote).is_empty());
    }

    #[tokio::test]
    async fn test_sync_table_upsert_failure_keeps_prior_rows() {
        let local = Rows(vec![row(1, "a"), row(2, "b"), row(3, "c")]);
        let remote = Remote {
            fail_upsert_at: Some(2),
            ..remote_with(&[9])
        };
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&local, &remote, table).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.synced_count, 1);
        assert!(outcome.error_message.starts_with("upsert into 'dictionaries' failed"));
        assert!(outcome.error_message.contains("unique constraint"));
        // no cleanup after a failed upsert
        assert_eq!(remote_ids(&remote), vec![1, 9]);
    }

    #[tokio::test]
    async fn test_sync_table_delete_failure_still_succeeds() {
        let local = Rows(vec![row(1, "a")]);
        let remote = Remote {
            fail_deletes: true,
            ..remote_with(&[1, 2])
        };
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&local, &remote, table).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.synced_count, 1);
        assert_eq!(outcome.deleted_count, 0);
        assert!(outcome.error_message.is_empty());
        assert_eq!(remote_ids(&remote), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stale_rows_deleted_in_chunks() {
        let local = Rows(vec![row(1, "a")]);
        let stale: Vec<i64> = (2..=2501).collect();
        let mut ids = vec![1];
        ids.extend(&stale);
        let remote = remote_with(&ids);
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&local, &remote, table).await.unwrap();

        assert_eq!(outcome.deleted_count, 2500);
        assert_eq!(*remote.delete_chunks.lock().unwrap(), vec![1000, 1000, 500]);
        assert_eq!(remote_ids(&remote), vec![1]);
    }

    #[tokio::test]
    async fn test_sync_table_unkeyed_rows_skip_cleanup() {
        let mut fractional = row(0, "a");
        fractional[0] = SqlValue::Real(1.5);
        let local = Rows(vec![fractional]);
        let remote = remote_with(&[7]);
        let table = catalog::find("dictionaries").unwrap();

        let outcome = sync_table(&local, &remote, table).await.unwrap();

        assert_eq!(outcome, SyncOutcome::succeeded("dictionaries", 1, 0));
        // neither the upserted row nor the unmatched remote row is deleted
        assert_eq!(remote_ids(&remote), vec![2, 7]);
        assert!(remote.delete_chunks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_table_local_read_error_aborts() {
        let remote = Remote::default();
        let table = catalog::find("dictionaries").unwrap();

        let err = sync_table(&Unreadable, &remote, table).await.unwrap_err();

        assert!(matches!(err, SyncError::LocalRead { ref table, .. } if table == "dictionaries"));
    }
}
