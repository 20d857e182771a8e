// ABOUTME: Persisted CLI state stored under ~/.orange-sync
// ABOUTME: Remembers a default sync target; the password is never written to disk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::target::SyncTarget;

#[derive(Serialize, Deserialize, Default)]
pub struct AppState {
    pub target: Option<SyncTarget>,
}

fn get_state_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    let state_dir = home_dir.join(".orange-sync");
    if !state_dir.exists() {
        fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;
    }
    Ok(state_dir.join("state.json"))
}

pub fn load() -> Result<AppState> {
    let state_path = get_state_path()?;
    if !state_path.exists() {
        return Ok(AppState::default());
    }
    let state_file = fs::File::open(&state_path)?;
    let state = serde_json::from_reader(state_file)
        .with_context(|| format!("Corrupt state file {}", state_path.display()))?;
    Ok(state)
}

pub fn save(state: &AppState) -> Result<()> {
    let state_path = get_state_path()?;
    let persisted = AppState {
        target: state.target.as_ref().map(SyncTarget::without_password),
    };
    let state_file = fs::File::create(state_path)?;
    serde_json::to_writer_pretty(state_file, &persisted)?;
    Ok(())
}
