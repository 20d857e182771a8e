// ABOUTME: Shared helpers for identifier validation and local paths
// ABOUTME: Guards table names interpolated into SQL and resolves the app data directory

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Validate a SQL identifier used in generated statements.
///
/// Table and column names cannot be bound as parameters, so anything that
/// ends up interpolated into SQL must be a plain identifier: it starts with
/// a letter or underscore and contains only ASCII letters, digits and
/// underscores (max 63 characters, the PostgreSQL limit).
///
/// # Examples
///
/// ```
/// # use orange_sync::utils::validate_identifier;
/// assert!(validate_identifier("dictionary_item").is_ok());
/// assert!(validate_identifier("123abc").is_err());
/// assert!(validate_identifier("users; DROP TABLE users;").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<()> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        bail!("Invalid table name: identifier cannot be empty or whitespace-only");
    }

    if trimmed.len() > 63 {
        bail!(
            "Invalid table name: '{}' exceeds maximum length of 63 characters (got {})",
            sanitize_identifier(trimmed),
            trimmed.len()
        );
    }

    let mut chars = trimmed.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            bail!(
                "Invalid table name: '{}' must start with a letter or underscore, not '{}'",
                sanitize_identifier(trimmed),
                first
            );
        }
    }

    for (i, c) in trimmed.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' {
            bail!(
                "Invalid table name: '{}' contains invalid character '{}' at position {}",
                sanitize_identifier(trimmed),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection.
///
/// ```
/// # use orange_sync::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Directory the desktop app keeps its data in (`<config dir>/FruitsAI/Orange`).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("FruitsAI").join("Orange"))
}

/// Default location of the local SQLite store.
pub fn default_local_db_path() -> PathBuf {
    app_data_dir()
        .map(|dir| dir.join("orange.db"))
        .unwrap_or_else(|| PathBuf::from("orange.db"))
}
