//! Error types for the Panel survey pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the survey pipeline.
///
/// Only `Config`, `Parse`, `Schema` and `Validation` are expected to abort a
/// run before any model call is made. `AnswerDecode` and `Batch` describe
/// failures that the scheduler contains and logs, and `Aggregation` is an
/// empty state rather than a failure.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelError {
    /// No usable model transport is configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Question text produced no questions
    #[error("Parse error: {0}")]
    Parse(String),

    /// Questions cannot be turned into a response schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Input records or run parameters are unusable
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single participant's response could not be decoded
    #[error("Answer decode error for participant {participant_id}: {message}")]
    AnswerDecode { participant_id: u32, message: String },

    /// An entire batch failed at the transport level
    #[error("Batch {batch_index} failed: {message}")]
    Batch { batch_index: usize, message: String },

    /// No results match the active filters
    #[error("{0}")]
    Aggregation(String),

    /// Persona generation produced nothing usable
    #[error("Persona generation error: {0}")]
    Generation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "CSV"
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates a Schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Aggregation error
    pub fn aggregation(message: impl Into<String>) -> Self {
        Self::Aggregation(message.into())
    }

    /// Creates a Generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Serialization error for the given format
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a parse error
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Check if this is a schema error
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if this is an aggregation (empty filter result) error
    pub fn is_aggregation(&self) -> bool {
        matches!(self, Self::Aggregation(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PanelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PanelError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PanelError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PanelError>`.
pub type Result<T> = std::result::Result<T, PanelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_convert_to_serialization() {
        let err: PanelError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        match err {
            PanelError::Serialization { format, .. } => assert_eq!(format, "JSON"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn aggregation_message_is_displayed_verbatim() {
        let err = PanelError::aggregation("No results match the selected filters");
        assert_eq!(err.to_string(), "No results match the selected filters");
    }
}
