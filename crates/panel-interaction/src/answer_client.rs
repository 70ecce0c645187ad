//! Obtains one persona's structured survey answers.

use once_cell::sync::Lazy;
use panel_core::persona::Persona;
use panel_core::survey::{AnswerMap, Question, SCHEMA_NAME, SurveySchema};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chat::{ChatMessage, ChatModel, ChatRequest, ModelCallError, ResponseFormat};
use crate::prompts;

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("invalid JSON block regex"));

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnswerError {
    /// The call failed; the rest of the batch should not be attempted.
    #[error("model call failed: {0}")]
    Transport(#[from] ModelCallError),

    /// The call succeeded but the reply was not a JSON object.
    #[error("could not decode answer: {message}")]
    Decode { message: String, excerpt: String },
}

impl AnswerError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Sends the survey to the model in the voice of one persona.
pub struct AnswerClient<M> {
    model: M,
}

impl<M: ChatModel> AnswerClient<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the decoded answer object.
    ///
    /// The answers are not checked against the option domain; callers log
    /// mismatches via [`SurveySchema::check_answers`] and keep the data.
    pub async fn answer(
        &self,
        persona: &Persona,
        questions: &[Question],
        schema: &SurveySchema,
        model: &str,
        temperature: f32,
    ) -> Result<AnswerMap, AnswerError> {
        let system = prompts::survey_system_prompt(persona).map_err(prompt_error)?;
        let user = prompts::survey_user_prompt(questions, schema).map_err(prompt_error)?;

        let request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            model: model.to_string(),
            temperature,
            response_format: Some(ResponseFormat::strict_schema(
                SCHEMA_NAME,
                schema.to_json_schema(),
            )),
        };

        let raw = self.model.call(request).await?;
        decode_object(&raw)
    }
}

fn prompt_error(err: panel_core::PanelError) -> AnswerError {
    AnswerError::Decode {
        message: err.to_string(),
        excerpt: String::new(),
    }
}

/// Decodes a reply into a JSON object.
///
/// The whole text is parsed first. Failing that, the span from the first
/// `{` to the last `}` is parsed, which strips code fences and chatter.
pub fn decode_object(raw: &str) -> Result<Map<String, Value>, AnswerError> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(map);
    }

    let block = JSON_BLOCK
        .find(raw)
        .ok_or_else(|| decode_error("no JSON object in reply", raw))?;
    match serde_json::from_str::<Value>(block.as_str()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(decode_error("reply is not a JSON object", raw)),
        Err(err) => Err(decode_error(&err.to_string(), raw)),
    }
}

fn decode_error(message: &str, raw: &str) -> AnswerError {
    AnswerError::Decode {
        message: message.to_string(),
        excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
    }
}
