// ABOUTME: CLI entry point for orange-sync
// ABOUTME: Parses commands, initializes logging, and routes to command handlers

use anyhow::Context;
use clap::{Parser, Subcommand};
use orange_sync::commands::{self, TargetOptions};
use orange_sync::service::SyncService;
use orange_sync::sqlite::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "orange-sync")]
#[command(about = "Push the local Orange database to a remote MySQL or PostgreSQL database", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Path to the local SQLite database
    #[arg(long = "local-db", env = "DB_PATH", global = true)]
    local_db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print connection-form defaults from the DB_* environment as JSON
    Config,
    /// List the synchronizable tables
    Tables {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the remote database is reachable
    TestConnection {
        #[command(flatten)]
        target: TargetOptions,
    },
    /// Compare row counts between the local and remote databases
    Compare {
        #[command(flatten)]
        target: TargetOptions,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push local tables to the remote and remove stale remote rows
    Execute {
        #[command(flatten)]
        target: TargetOptions,
        /// Tables to sync, in order (comma-separated; default: all, parents first)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the default sync target
    Target {
        #[command(flatten)]
        args: commands::target::TargetArgs,
    },
}

fn open_service(local_db: Option<PathBuf>) -> anyhow::Result<SyncService> {
    let path = local_db.unwrap_or_else(orange_sync::utils::default_local_db_path);
    let store = SqliteStore::open(&path).context("Failed to open local database")?;
    Ok(SyncService::with_drivers(Arc::new(store)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // We need to parse CLI args early to get the log level
    let cli = Cli::parse();

    // Initialize logging
    // 1. RUST_LOG environment variable has highest precedence
    // 2. --log flag is used if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config => commands::config(),
        Commands::Tables { json } => commands::tables(json),
        Commands::TestConnection { target } => {
            let target = target.resolve()?;
            commands::test_connection(&target).await
        }
        Commands::Compare { target, json } => {
            let target = target.resolve()?;
            let service = open_service(cli.local_db)?;
            commands::compare(&service, &target, json).await
        }
        Commands::Execute {
            target,
            tables,
            json,
        } => {
            let target = target.resolve()?;
            let service = open_service(cli.local_db)?;
            commands::execute(&service, &target, &tables, json).await
        }
        Commands::Target { args } => commands::target::command(args).await,
    }
}
