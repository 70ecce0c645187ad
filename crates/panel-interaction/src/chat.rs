//! Chat-completion abstraction shared by every model-backed component.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Structured output requested from the model.
///
/// Serializes to the `response_format` object of the chat-completions API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: Value,
}

impl ResponseFormat {
    pub fn strict_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict: true,
                schema,
            },
        }
    }
}

/// One chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub response_format: Option<ResponseFormat>,
}

/// Failure of the model call itself, as opposed to a bad answer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelCallError {
    #[error("request failed: {message}")]
    Transport { message: String, is_retryable: bool },

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("unreadable response: {0}")]
    InvalidResponse(String),
}

impl ModelCallError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { is_retryable, .. } | Self::Http { is_retryable, .. } => *is_retryable,
            Self::EmptyResponse | Self::InvalidResponse(_) => false,
        }
    }
}

/// A chat-completions backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the request and returns the text content of the first choice.
    async fn call(&self, request: ChatRequest) -> Result<String, ModelCallError>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn call(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        (**self).call(request).await
    }
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Box<T> {
    async fn call(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        (**self).call(request).await
    }
}
