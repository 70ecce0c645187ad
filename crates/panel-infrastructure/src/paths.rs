//! Unified path management for panel configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/panel/             # Config directory (platform config dir)
//! ├── config.toml              # Survey and generation defaults
//! └── secret.json              # API keys
//! ```

use std::path::PathBuf;

use thiserror::Error;

const APP_DIR: &str = "panel";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Config directory could not be determined.
    #[error("Cannot find config directory")]
    ConfigDirNotFound,
}

pub struct PanelPaths;

impl PanelPaths {
    /// Returns the panel configuration directory (e.g. `~/.config/panel/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `secret.json`.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
