//! Unified path management for PeakState client files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/peakstate/         # Config directory
//! └── config.toml              # Client configuration
//!
//! ~/.local/share/peakstate/    # Data directory
//! └── session.toml             # Persisted credential pair (mode 600)
//! ```

use std::path::PathBuf;
use thiserror::Error;

use peak_core::PeakError;

const APP_DIR: &str = "peakstate";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot determine the platform {0} directory")]
    DirNotFound(&'static str),
}

impl From<PathError> for PeakError {
    fn from(err: PathError) -> Self {
        PeakError::config(err.to_string())
    }
}

pub struct PeakPaths;

impl PeakPaths {
    /// Returns the configuration directory (e.g. `~/.config/peakstate/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("config"))
    }

    /// Returns the data directory (e.g. `~/.local/share/peakstate/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("data"))
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the session file, inside `data_dir` when one is configured.
    pub fn session_file(data_dir: Option<&std::path::Path>) -> Result<PathBuf, PathError> {
        let dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::data_dir()?,
        };
        Ok(dir.join("session.toml"))
    }
}
