// ABOUTME: Per-table comparison and synchronization of local rows to the remote
// ABOUTME: Report types returned to callers, plus the comparator and table synchronizer

pub mod compare;
pub mod table;

use serde::{Deserialize, Serialize};

pub use compare::{compare_tables, REMOTE_COUNT_UNAVAILABLE};
pub use table::sync_table;

/// Row counts for one table on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareResult {
    pub table_name: String,
    pub local_count: i64,
    /// `-1` when the remote table is missing or unreadable.
    pub remote_count: i64,
}

impl CompareResult {
    pub fn remote_missing(&self) -> bool {
        self.remote_count == REMOTE_COUNT_UNAVAILABLE
    }

    pub fn in_sync(&self) -> bool {
        self.local_count == self.remote_count
    }
}

/// Final state of one table's synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub table_name: String,
    /// Rows upserted, including those upserted before a failure.
    pub synced_count: i64,
    pub success: bool,
    pub error_message: String,
    /// Stale remote rows removed. Informational; cleanup failures do not
    /// affect `success`.
    #[serde(default)]
    pub deleted_count: u64,
}

impl SyncOutcome {
    pub fn succeeded(table_name: &str, synced_count: i64, deleted_count: u64) -> Self {
        Self {
            table_name: table_name.to_string(),
            synced_count,
            success: true,
            error_message: String::new(),
            deleted_count,
        }
    }

    pub fn failed(table_name: &str, synced_count: i64, error_message: impl Into<String>) -> Self {
        Self {
            table_name: table_name.to_string(),
            synced_count,
            success: false,
            error_message: error_message.into(),
            deleted_count: 0,
        }
    }
}
