// ABOUTME: Trait over the local system of record consumed by the sync engine
// ABOUTME: Lets the orchestrator take the local store as an injected collaborator

use anyhow::Result;

use crate::catalog::TableDescriptor;
use crate::value::Row;

/// Read access to the local database.
///
/// Implementations must project rows in `table.columns` order; the upsert
/// statement binds values positionally.
pub trait LocalStore: Send + Sync {
    fn count_rows(&self, table: &TableDescriptor) -> Result<i64>;

    fn read_rows(&self, table: &TableDescriptor) -> Result<Vec<Row>>;
}
