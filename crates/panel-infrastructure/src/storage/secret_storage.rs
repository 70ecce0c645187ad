//! Secret configuration file storage.
//!
//! Provides read-only loading of ~/.config/panel/secret.json.

use std::fs;
use std::path::PathBuf;

use panel_core::config::SecretConfig;
use thiserror::Error;

use crate::paths::PanelPaths;

/// Errors that can occur during secret storage operations.
#[derive(Debug, Error)]
pub enum SecretStorageError {
    /// Configuration file not found.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    /// Config directory not found.
    #[error("Could not determine config directory")]
    ConfigDirNotFound,
}

/// Storage for the secret configuration file (secret.json).
///
/// Responsibilities:
/// - Load secret.json from ~/.config/panel/
/// - Parse JSON into the `SecretConfig` model
///
/// Does NOT:
/// - Write or modify secret files (read-only)
/// - Validate API keys
///
/// # Security Note
///
/// The file is plaintext JSON and should be readable only by its owner
/// (e.g. mode 600). Keys are never logged.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a new SecretStorage with the default path.
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = PanelPaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a new SecretStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the secret configuration from the JSON file.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Returns the path to the secret file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
