//! Path management for stagewatch configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/stagewatch/        # Config directory (platform config dir)
//! └── config.toml              # Client configuration
//! ```

use std::path::PathBuf;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STAGEWATCH_CONFIG";

const APP_DIR: &str = "stagewatch";
const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct StagewatchPaths;

impl StagewatchPaths {
    /// Returns the stagewatch configuration directory (e.g. `~/.config/stagewatch/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the default path of `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Resolves which config file to read.
    ///
    /// Order: explicit path, then `$STAGEWATCH_CONFIG`, then the platform
    /// default. Returns `None` only when no candidate can be determined.
    pub fn resolve_config_file(explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(|| Self::config_file().ok())
    }
}
