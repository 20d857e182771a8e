// ABOUTME: Configuration sources for sync targets and connection-form defaults
// ABOUTME: Merges persisted state, TOML target files and CLI/env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::target::{SyncTarget, TlsMode};

/// Non-secret defaults for a connection form, taken from the application's
/// `DB_*` environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDefaults {
    pub db_type: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub db_name: String,
    pub ssl_mode: String,
}

impl SyncDefaults {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build defaults from an arbitrary variable lookup.
    ///
    /// `DB_TYPE=sqlite` describes the local store, not a remote engine, so
    /// it falls back to `mysql`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_type = match get("DB_TYPE").map(|v| v.to_ascii_lowercase()) {
            Some(engine) if engine == "postgres" || engine == "postgresql" => "postgres",
            _ => "mysql",
        };
        let default_port = if db_type == "postgres" { 5432 } else { 3306 };
        let port = get("DB_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(default_port);

        Self {
            db_type: db_type.to_string(),
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            user: get("DB_USER").unwrap_or_else(|| "root".to_string()),
            db_name: get("DB_NAME").unwrap_or_else(|| "orange".to_string()),
            ssl_mode: get("DB_SSL_MODE").unwrap_or_else(|| "disable".to_string()),
        }
    }
}

/// Partial target description. Every set field replaces the corresponding
/// field of the target it is applied to.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetOverrides {
    #[serde(rename = "db_type", alias = "engine", default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "db_name", alias = "database", default)]
    pub database: Option<String>,
    #[serde(rename = "ssl_mode", alias = "tls_mode", default)]
    pub ssl_mode: Option<String>,
}

impl TargetOverrides {
    pub fn apply(&self, target: &mut SyncTarget) -> Result<()> {
        if let Some(engine) = &self.engine {
            target.engine = engine.trim().to_string();
        }
        if let Some(host) = &self.host {
            target.host = host.clone();
        }
        if let Some(port) = self.port {
            target.port = port;
        }
        if let Some(user) = &self.user {
            target.user = user.clone();
        }
        if let Some(password) = &self.password {
            target.password = password.clone();
        }
        if let Some(database) = &self.database {
            target.database = database.clone();
        }
        if let Some(mode) = &self.ssl_mode {
            target.tls_mode = if mode.trim().is_empty() {
                None
            } else {
                Some(mode.parse::<TlsMode>()?)
            };
        }
        Ok(())
    }
}

/// Load a target description from a TOML file.
///
/// ```toml
/// db_type = "postgres"
/// host = "db.example.com"
/// user = "sync"
/// db_name = "orange"
/// ssl_mode = "require"
/// ```
pub fn load_target_file(path: &Path) -> Result<TargetOverrides> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target config '{}'", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse target config '{}'", path.display()))
}

/// Merge target sources; later sources win.
///
/// Order: persisted target, then the TOML file, then flags/environment.
pub fn resolve_target(
    persisted: Option<SyncTarget>,
    file: Option<&Path>,
    overrides: &TargetOverrides,
) -> Result<SyncTarget> {
    let mut target = persisted.unwrap_or_default();

    if let Some(path) = file {
        load_target_file(path)?
            .apply(&mut target)
            .with_context(|| format!("Invalid target config '{}'", path.display()))?;
    }

    overrides
        .apply(&mut target)
        .context("Invalid target options")?;

    if target.engine.is_empty() {
        anyhow::bail!(
            "No sync target configured. Pass --db-type/--host/... or run `orange-sync target set`."
        );
    }

    Ok(target)
}
