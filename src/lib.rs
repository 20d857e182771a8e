// ABOUTME: Library root for orange-sync, the local-to-remote database sync engine
// ABOUTME: Exposes the catalog, stores, synchronizer and orchestrator used by the CLI

pub mod catalog;
pub mod commands;
pub mod config;
pub mod dialect;
pub mod error;
pub mod local;
pub mod query;
pub mod remote;
pub mod service;
pub mod sqlite;
pub mod state;
pub mod sync;
pub mod target;
pub mod utils;
pub mod value;

pub use error::{Result, SyncError};
pub use service::SyncService;
pub use target::{SyncTarget, TlsMode};
