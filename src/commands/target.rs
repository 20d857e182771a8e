// ABOUTME: `target` subcommand - persist, show or clear the default sync target
// ABOUTME: Stored targets never include the password

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::sync::TargetOptions;
use crate::state;

#[derive(Args)]
pub struct TargetArgs {
    #[command(subcommand)]
    command: TargetCommands,
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Set the default sync target
    Set {
        #[command(flatten)]
        target: TargetOptions,
    },
    /// Unset the default sync target
    Unset,
    /// Show the default sync target
    Get,
}

pub async fn command(args: TargetArgs) -> Result<()> {
    match args.command {
        TargetCommands::Set { target } => {
            let resolved = target.resolve_standalone()?;
            resolved
                .validate()
                .context("Refusing to save an incomplete target")?;

            let mut state = state::load().context("Failed to load state")?;
            state.target = Some(resolved.clone());
            state::save(&state).context("Failed to save state")?;

            println!("Sync target set to: {}", resolved.redacted());
            if !resolved.password.is_empty() {
                println!("The password was not saved; pass --password or SYNC_DB_PASSWORD when syncing.");
            }
        }
        TargetCommands::Unset => {
            let mut state = state::load().context("Failed to load state")?;
            state.target = None;
            state::save(&state).context("Failed to save state")?;
            println!("Sync target unset.");
        }
        TargetCommands::Get => {
            let state = state::load().context("Failed to load state")?;
            match state.target {
                Some(target) => println!("Current sync target: {}", target.redacted()),
                None => println!("Sync target is not set."),
            }
        }
    }
    Ok(())
}
