// ABOUTME: Command implementations for the orange-sync CLI
// ABOUTME: Exports config, tables, test-connection, compare, execute and target commands

pub mod sync;
pub mod target;

pub use sync::{compare, config, execute, tables, test_connection, TargetOptions};
