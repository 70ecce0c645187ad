//! Provider resolution for the chat-completions agent.
//!
//! Priority: `~/.config/panel/secret.json` (`openrouter`, then `openai`),
//! then environment variables (`OPENROUTER_*`, then `OPENAI_*`).

use panel_core::config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL, ProviderConfig,
    SecretConfig,
};
use panel_core::{PanelError, Result};
use panel_infrastructure::SecretStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    OpenAI,
}

impl Provider {
    fn env_prefix(self) -> &'static str {
        match self {
            Self::OpenRouter => "OPENROUTER",
            Self::OpenAI => "OPENAI",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenRouter => DEFAULT_BASE_URL,
            Self::OpenAI => OPENAI_BASE_URL,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenRouter => DEFAULT_MODEL,
            Self::OpenAI => OPENAI_DEFAULT_MODEL,
        }
    }
}

/// Credentials and endpoint the agent will talk to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
}

impl ResolvedProvider {
    fn from_config(provider: Provider, config: ProviderConfig) -> Self {
        Self {
            provider,
            api_key: config.api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            default_model: config
                .model_name
                .unwrap_or_else(|| provider.default_model().to_string()),
        }
    }
}

/// Resolves the provider from the secret file and the process environment.
pub fn load_provider() -> Result<ResolvedProvider> {
    let secrets = match SecretStorage::new() {
        Ok(storage) => match storage.load() {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::debug!("No usable secret file: {}", err);
                None
            }
        },
        Err(err) => {
            tracing::debug!("Secret storage unavailable: {}", err);
            None
        }
    };
    resolve_provider(secrets, |key| std::env::var(key).ok())
}

/// Resolves the provider from already-loaded secrets and an env lookup.
pub fn resolve_provider<F>(secrets: Option<SecretConfig>, env: F) -> Result<ResolvedProvider>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secrets) = secrets {
        if let Some(config) = secrets.openrouter {
            return Ok(ResolvedProvider::from_config(Provider::OpenRouter, config));
        }
        if let Some(config) = secrets.openai {
            return Ok(ResolvedProvider::from_config(Provider::OpenAI, config));
        }
    }

    for provider in [Provider::OpenRouter, Provider::OpenAI] {
        let prefix = provider.env_prefix();
        let Some(api_key) = env(&format!("{prefix}_API_KEY")).filter(|key| !key.trim().is_empty())
        else {
            continue;
        };
        let config = ProviderConfig {
            api_key,
            model_name: env(&format!("{prefix}_MODEL_NAME")),
            base_url: env(&format!("{prefix}_BASE_URL")),
        };
        return Ok(ResolvedProvider::from_config(provider, config));
    }

    Err(PanelError::config(
        "No API key found in ~/.config/panel/secret.json, OPENROUTER_API_KEY or OPENAI_API_KEY",
    ))
}
