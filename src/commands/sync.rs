// ABOUTME: Sync commands - config defaults, catalog listing, connection test, compare, execute
// ABOUTME: Resolves the target from state, TOML and flags, then prints reports

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use crate::catalog;
use crate::config::{self, SyncDefaults, TargetOverrides};
use crate::remote::DriverConnector;
use crate::service::{self, SyncService};
use crate::state;
use crate::sync::{CompareResult, SyncOutcome};
use crate::target::SyncTarget;

/// Remote target flags shared by every command that talks to the remote.
#[derive(Args, Clone, Debug, Default)]
pub struct TargetOptions {
    /// Remote engine: mysql or postgres
    #[arg(long = "db-type", env = "SYNC_DB_TYPE")]
    pub db_type: Option<String>,
    /// Remote host
    #[arg(long, env = "SYNC_DB_HOST")]
    pub host: Option<String>,
    /// Remote port (defaults to 3306 for mysql, 5432 for postgres)
    #[arg(long, env = "SYNC_DB_PORT")]
    pub port: Option<u16>,
    /// Remote user
    #[arg(long, env = "SYNC_DB_USER")]
    pub user: Option<String>,
    /// Remote password (never persisted)
    #[arg(long, env = "SYNC_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Remote database name
    #[arg(long = "db-name", env = "SYNC_DB_NAME")]
    pub db_name: Option<String>,
    /// TLS mode: disable or require (postgres defaults to require)
    #[arg(long = "ssl-mode", env = "SYNC_DB_SSL_MODE")]
    pub ssl_mode: Option<String>,
    /// TOML file describing the target; flags override its values
    #[arg(long = "target-config")]
    pub target_config: Option<PathBuf>,
}

impl TargetOptions {
    fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            engine: self.db_type.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.db_name.clone(),
            ssl_mode: self.ssl_mode.clone(),
        }
    }

    /// Target from persisted state, the TOML file and these flags.
    pub fn resolve(&self) -> Result<SyncTarget> {
        let persisted = state::load()?.target;
        config::resolve_target(persisted, self.target_config.as_deref(), &self.overrides())
    }

    /// Target from the TOML file and these flags only.
    pub fn resolve_standalone(&self) -> Result<SyncTarget> {
        config::resolve_target(None, self.target_config.as_deref(), &self.overrides())
    }
}

pub fn config() -> Result<()> {
    let defaults = SyncDefaults::from_env();
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

pub fn tables(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog::tables())?);
        return Ok(());
    }
    for table in catalog::tables() {
        println!(
            "{} (pk: {}): {}",
            table.name,
            table.primary_key,
            table.column_names().join(", ")
        );
    }
    Ok(())
}

pub async fn test_connection(target: &SyncTarget) -> Result<()> {
    match service::test_connection(&DriverConnector, target).await {
        Ok(()) => {
            println!("Connection successful: {}", target.redacted());
            Ok(())
        }
        Err(e) => bail!("Connection failed: {}", e),
    }
}

pub async fn compare(service: &SyncService, target: &SyncTarget, json: bool) -> Result<()> {
    let results = service.compare(target).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_compare(&results));
    }
    Ok(())
}

/// `--tables` as given, or the whole catalog (parents first) when omitted.
fn selected_tables(tables: &[String]) -> Vec<String> {
    if tables.is_empty() {
        catalog::table_names()
            .into_iter()
            .map(String::from)
            .collect()
    } else {
        tables.to_vec()
    }
}

pub async fn execute(
    service: &SyncService,
    target: &SyncTarget,
    tables: &[String],
    json: bool,
) -> Result<()> {
    let outcomes = service.execute(target, &selected_tables(tables)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print!("{}", format_outcomes(&outcomes));
    }

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.success)
        .map(|o| o.table_name.as_str())
        .collect();
    if !failed.is_empty() {
        bail!("{} table(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn format_compare(results: &[CompareResult]) -> String {
    let mut out = format!("{:<24} {:>10} {:>10}  {}\n", "TABLE", "LOCAL", "REMOTE", "STATUS");
    for r in results {
        let status = if r.remote_missing() {
            "remote missing"
        } else if r.in_sync() {
            "ok"
        } else {
            "differs"
        };
        out.push_str(&format!(
            "{:<24} {:>10} {:>10}  {}\n",
            r.table_name, r.local_count, r.remote_count, status
        ));
    }
    out
}

fn format_outcomes(outcomes: &[SyncOutcome]) -> String {
    let mut out = String::new();
    for o in outcomes {
        if o.success {
            out.push_str(&format!(
                "✓ {}: {} rows synced, {} stale rows deleted\n",
                o.table_name, o.synced_count, o.deleted_count
            ));
        } else {
            out.push_str(&format!(
                "✗ {}: {} ({} rows synced before failure)\n",
                o.table_name, o.error_message, o.synced_count
            ));
        }
    }
    out
}
