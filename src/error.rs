// ABOUTME: Error taxonomy for the sync engine
// ABOUTME: Separates whole-operation faults from per-table faults reported as data

use thiserror::Error;

/// Errors produced by the sync engine.
///
/// Only [`SyncError::UnsupportedEngine`], [`SyncError::InvalidTarget`],
/// [`SyncError::Connection`] and [`SyncError::LocalRead`] ever escape a
/// [`crate::service::SyncService`] call. The per-table variants are folded
/// into [`crate::sync::SyncOutcome`] values by the table synchronizer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unsupported database engine '{0}' (expected 'mysql' or 'postgres')")]
    UnsupportedEngine(String),

    #[error("invalid sync target: {0}")]
    InvalidTarget(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("failed to read local table '{table}': {message}")]
    LocalRead { table: String, message: String },

    #[error("upsert into '{table}' failed: {message}")]
    RowUpsert { table: String, message: String },

    #[error("stale row cleanup in '{table}' failed: {message}")]
    RowDelete { table: String, message: String },

    #[error("unknown table")]
    UnknownTable(String),
}

impl SyncError {
    /// Wrap a driver error as a connection failure, keeping the full cause chain.
    pub fn connection(err: anyhow::Error) -> Self {
        SyncError::Connection(format!("{:#}", err))
    }

    pub fn local_read(table: &str, err: anyhow::Error) -> Self {
        SyncError::LocalRead {
            table: table.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn row_upsert(table: &str, err: anyhow::Error) -> Self {
        SyncError::RowUpsert {
            table: table.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn row_delete(table: &str, err: anyhow::Error) -> Self {
        SyncError::RowDelete {
            table: table.to_string(),
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
