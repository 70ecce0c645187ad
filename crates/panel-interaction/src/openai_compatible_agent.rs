//! OpenAiCompatibleAgent - REST client for OpenAI-style chat completions.
//!
//! Works against OpenRouter (default), OpenAI, or any server exposing
//! `{base_url}/chat/completions`.
//! Configuration priority: ~/.config/panel/secret.json > environment variables

use std::time::Duration;

use async_trait::async_trait;
use panel_core::Result;
use panel_core::config::{ClientSettings, DEFAULT_APP_TITLE};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatModel, ChatRequest, ModelCallError, ResponseFormat};
use crate::config::{ResolvedProvider, load_provider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Agent implementation that talks to an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiCompatibleAgent {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenAiCompatibleAgent {
    /// Creates a new agent for the given endpoint.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
            referer: None,
            title: Some(DEFAULT_APP_TITLE.to_string()),
        }
    }

    pub fn from_provider(provider: ResolvedProvider) -> Self {
        Self::new(provider.api_key, provider.base_url, provider.default_model)
    }

    /// Loads configuration from ~/.config/panel/secret.json or environment variables.
    ///
    /// Priority:
    /// 1. ~/.config/panel/secret.json (`openrouter`, then `openai`)
    /// 2. OPENROUTER_API_KEY, then OPENAI_API_KEY
    pub fn try_from_env() -> Result<Self> {
        let provider = load_provider()?;
        tracing::info!(
            provider = ?provider.provider,
            base_url = %provider.base_url,
            "Using chat-completions provider"
        );
        Ok(Self::from_provider(provider))
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Sets the attribution headers OpenRouter shows in its dashboard.
    pub fn with_app_info(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    /// Applies the `[client]` table of config.toml.
    pub fn with_client_settings(self, settings: &ClientSettings) -> Self {
        self.with_timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .with_app_info(settings.referer.clone(), settings.title.clone())
    }

    /// Model used when a request leaves its model empty.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<String, ModelCallError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json");
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            request = request.header("X-Title", title);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|err| ModelCallError::Transport {
                message: format!("chat completion request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ModelCallError::InvalidResponse(err.to_string()))?;

        extract_text_response(parsed)
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to default HTTP client: {}", err);
            Client::new()
        })
}

#[async_trait]
impl ChatModel for OpenAiCompatibleAgent {
    async fn call(&self, request: ChatRequest) -> std::result::Result<String, ModelCallError> {
        let model = if request.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };
        tracing::debug!(model = %model, messages = request.messages.len(), "Sending chat completion");

        let body = ChatCompletionRequest {
            model,
            messages: request.messages,
            temperature: request.temperature,
            response_format: request.response_format,
        };
        self.send_request(&body).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(
    response: ChatCompletionResponse,
) -> std::result::Result<String, ModelCallError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ModelCallError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ModelCallError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ModelCallError::Http {
        status: status.as_u16(),
        message,
        is_retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date values are ignored
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use serde_json::json;

    #[test]
    fn client_settings_set_attribution_headers() {
        let settings = ClientSettings {
            referer: Some("https://panel.example".into()),
            ..ClientSettings::default()
        };
        let agent = OpenAiCompatibleAgent::new("sk-test", "https://openrouter.ai/api/v1/", "m")
            .with_client_settings(&settings);
        assert_eq!(agent.referer.as_deref(), Some("https://panel.example"));
        assert_eq!(agent.title.as_deref(), Some(DEFAULT_APP_TITLE));
        assert_eq!(agent.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth","code":"401"}}"#;
        let err = map_http_error(StatusCode::UNAUTHORIZED, body.to_string(), None);
        assert_eq!(
            err,
            ModelCallError::Http {
                status: 401,
                message: "Invalid API key".into(),
                is_retryable: false,
                retry_after: None,
            }
        );
    }

    #[test]
    fn plain_error_body_is_kept_and_rate_limits_retry() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down".to_string(),
            Some(Duration::from_secs(3)),
        );
        match err {
            ModelCallError::Http {
                message,
                is_retryable,
                retry_after,
                ..
            } => {
                assert_eq!(message, "slow down");
                assert!(is_retryable);
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn retry_after_seconds() {
        let header = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&header)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn first_choice_content_is_returned() {
        let parsed: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"question_1\":\"Yes\"}"}}]
        }))
        .unwrap();
        assert_eq!(extract_text_response(parsed).unwrap(), "{\"question_1\":\"Yes\"}");

        let empty: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(extract_text_response(empty), Err(ModelCallError::EmptyResponse));
    }

    #[test]
    fn request_body_shape() {
        let body = ChatCompletionRequest {
            model: "openai/gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.5,
            response_format: Some(ResponseFormat::JsonObject),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], json!("openai/gpt-4o-mini"));
        assert_eq!(value["messages"][0]["role"], json!("user"));
        assert_eq!(value["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let agent = OpenAiCompatibleAgent::new("key", "https://openrouter.ai/api/v1/", "m");
        assert_eq!(agent.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(agent.default_model(), "m");
    }
}
