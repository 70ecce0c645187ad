//! Configuration models.
//!
//! Secrets live in `secret.json`, tunable defaults in `config.toml`. Both
//! are loaded by the infrastructure layer; this module only defines shapes.

use serde::{Deserialize, Serialize};

/// Default chat-completions provider.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Title sent in the `X-Title` attribution header.
pub const DEFAULT_APP_TITLE: &str = "Shell Synthetic Persona Survey";

/// Root configuration structure for secret.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretConfig {
    /// OpenRouter API configuration
    #[serde(default)]
    pub openrouter: Option<ProviderConfig>,
    /// OpenAI API configuration
    #[serde(default)]
    pub openai: Option<ProviderConfig>,
}

/// Credentials and endpoint of one OpenAI-compatible provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Tunable defaults from config.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub survey: SurveySettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

/// Defaults for survey runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySettings {
    pub model: Option<String>,
    pub temperature: f32,
    /// Participants requested per run (capped at the population size)
    pub participants: usize,
    /// Number of batches run concurrently
    pub max_concurrent_batches: usize,
    /// Interval of the "still working" progress signal; 0 disables it
    pub heartbeat_ms: u64,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            participants: 20,
            max_concurrent_batches: 4,
            heartbeat_ms: 2_000,
        }
    }
}

/// Defaults for persona generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: Option<String>,
    pub temperature: f32,
    /// Personas requested per model call
    pub chunk_size: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.9,
            chunk_size: 20,
        }
    }
}

/// HTTP client options for the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    /// Sent as `HTTP-Referer`; OpenRouter attributes usage to it
    pub referer: Option<String>,
    /// Sent as `X-Title`
    pub title: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            referer: None,
            title: Some(DEFAULT_APP_TITLE.to_string()),
        }
    }
}
