// ABOUTME: Closed set of supported remote SQL dialects
// ABOUTME: Each variant knows its placeholder syntax, upsert clause, and defaults

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Remote database dialect.
///
/// Every piece of engine-specific SQL the sync engine emits goes through
/// one of these methods, so adding behavior for an engine means adding a
/// match arm here rather than string comparisons at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::MySql => 3306,
            Dialect::Postgres => 5432,
        }
    }

    /// Positional parameter marker for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
        }
    }

    /// Comma-separated placeholders for parameters `start..start + count`.
    pub fn placeholders(&self, start: usize, count: usize) -> String {
        (start..start + count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SET` assignment taking the value proposed by the failed insert.
    pub fn update_assignment(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("{} = VALUES({})", column, column),
            Dialect::Postgres => format!("{} = EXCLUDED.{}", column, column),
        }
    }

    /// Conflict handling tail appended after `VALUES (...)`.
    pub fn conflict_clause(&self, primary_key: &str, assignments: &[String]) -> String {
        match self {
            Dialect::MySql if assignments.is_empty() => {
                // MySQL has no DO NOTHING; a self-assignment is a no-op update
                format!(
                    "ON DUPLICATE KEY UPDATE {}",
                    self.update_assignment(primary_key)
                )
            }
            Dialect::MySql => format!("ON DUPLICATE KEY UPDATE {}", assignments.join(", ")),
            Dialect::Postgres if assignments.is_empty() => {
                format!("ON CONFLICT ({}) DO NOTHING", primary_key)
            }
            Dialect::Postgres => format!(
                "ON CONFLICT ({}) DO UPDATE SET {}",
                primary_key,
                assignments.join(", ")
            ),
        }
    }

    /// Expression rendering a key column as text so keys compare the same on both sides.
    pub fn key_as_text(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({} AS CHAR)", column),
            Dialect::Postgres => format!("CAST({} AS TEXT)", column),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(SyncError::UnsupportedEngine(value.to_string())),
        }
    }
}
