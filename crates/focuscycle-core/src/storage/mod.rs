mod config;
pub mod database;
pub mod migrations;
mod tracker;

pub use config::{Config, FeedbackConfig};
pub use database::{Database, TaskSessionStats, MIN_REWARDED_FOCUS_SECS};
pub use tracker::SqliteSessionTracker;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focuscycle[-dev]/` based on FOCUSCYCLE_ENV.
///
/// Set FOCUSCYCLE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSCYCLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focuscycle-dev")
    } else {
        base_dir.join("focuscycle")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
