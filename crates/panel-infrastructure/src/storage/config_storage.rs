//! Settings file storage.
//!
//! Reads and writes `config.toml`. Writes go through a temporary file in the
//! same directory followed by a rename, so a crash never leaves a truncated
//! settings file behind.

use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::PathBuf;

use panel_core::config::Settings;
use thiserror::Error;

use crate::paths::PanelPaths;

/// Errors that can occur during config storage operations.
#[derive(Debug, Error)]
pub enum ConfigStorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
    /// Config directory not found.
    #[error("Could not determine config directory")]
    ConfigDirNotFound,
}

/// Storage for `config.toml`.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a storage handle for the default path.
    pub fn new() -> Result<Self, ConfigStorageError> {
        let path = PanelPaths::config_file().map_err(|_| ConfigStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a storage handle for a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads settings. A missing or empty file yields the defaults.
    pub fn load(&self) -> Result<Settings, ConfigStorageError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        Ok(toml::from_str(&content)?)
    }

    /// Saves settings atomically.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigStorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(settings)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!("Saved settings to {:?}", self.path);

        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf, ConfigStorageError> {
        let invalid = |message: &str| {
            ConfigStorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                message.to_string(),
            ))
        };
        let parent = self.path.parent().ok_or_else(|| invalid("Path has no parent directory"))?;
        let file_name = self.path.file_name().ok_or_else(|| invalid("Path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(temp_dir.path().join("config.toml"));
        assert_eq!(storage.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("config.toml");
        let storage = ConfigStorage::with_path(file_path.clone());

        let mut settings = Settings::default();
        settings.survey.max_concurrent_batches = 6;
        settings.survey.model = Some("openai/gpt-4o".to_string());
        settings.generation.chunk_size = 10;

        storage.save(&settings).unwrap();
        assert_eq!(storage.load().unwrap(), settings);

        // No temp file left behind
        assert!(!temp_dir.path().join("nested").join(".config.toml.tmp").exists());
        assert!(file_path.exists());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, "[survey\nbroken").unwrap();

        let result = ConfigStorage::with_path(file_path).load();
        assert!(matches!(result, Err(ConfigStorageError::TomlParseError(_))));
    }
}
