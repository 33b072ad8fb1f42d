mod config;

pub use config::{
    AlarmConfig, AudioConfig, Config, DaemonConfig, PuzzleConfig, UpdaterConfig,
    MAX_HISTORY_DAYS, MAX_PUZZLES_REQUIRED,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/dawnlock[-dev]/` based on DAWNLOCK_ENV.
///
/// Set DAWNLOCK_ENV=dev to use the development data directory, or
/// DAWNLOCK_HOME to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAWNLOCK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DAWNLOCK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("dawnlock-dev")
            } else {
                base_dir.join("dawnlock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
