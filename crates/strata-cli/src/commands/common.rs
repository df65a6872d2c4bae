//! Helpers shared by the command implementations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use strata_core::config::Config;
use strata_store::Store;

use crate::cli::GlobalArgs;

/// Load the project config: explicit `--config` path wins, otherwise
/// `strata.yml` in the project directory.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(Path::new(&global.project_dir)),
    }
    .context("failed to load project configuration")?;
    Ok(config)
}

/// Resolve a config-relative path against the project directory.
pub fn project_path(global: &GlobalArgs, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(&global.project_dir).join(path)
    }
}

/// Open the store for this project, creating parent directories for a
/// file-backed database on first use.
pub fn open_store(global: &GlobalArgs, config: &Config) -> Result<Store> {
    if config.database.path == ":memory:" {
        return Ok(Store::open_memory()?);
    }
    let db_path = project_path(global, &config.database.path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(Store::open(&db_path)?)
}
