//! Initialization of the forkfleet state directory.
//!
//! ```text
//! .forkfleet/
//! ├── fleet.toml          # Configuration (written by `config init`)
//! ├── tokens.txt          # Imported collaborator tokens
//! ├── token_cache.json    # Validated token -> username map
//! ├── state/              # Durable checklists (invited/accepted/forked)
//! └── logs/               # Failure log and rotated run logs
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The name of the forkfleet state directory.
pub const FLEET_DIR: &str = ".forkfleet";

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .forkfleet directory
    pub fleet_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Create the `.forkfleet/` layout under `project_dir`. Idempotent.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let fleet_dir = get_fleet_dir(project_dir);
    let created = !fleet_dir.exists();

    for dir in [
        fleet_dir.clone(),
        fleet_dir.join("state"),
        fleet_dir.join("logs"),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    Ok(InitResult { fleet_dir, created })
}

pub fn get_fleet_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(FLEET_DIR)
}

pub fn is_initialized(project_dir: &Path) -> bool {
    get_fleet_dir(project_dir).is_dir()
}
