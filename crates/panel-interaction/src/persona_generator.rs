//! Generates a synthetic persona population for a segment description.
//!
//! The model returns `{"personas": [...]}` under a strict JSON schema whose
//! item properties are the requested field names. Records are validated into
//! [`Persona`]s; nothing the model writes is ever executed.

use panel_core::persona::Persona;
use panel_core::{PanelError, Result};
use serde_json::{Map, Value, json};

use crate::answer_client::decode_object;
use crate::chat::{ChatMessage, ChatModel, ChatRequest, ResponseFormat};
use crate::prompts::{self, FieldSpec, GenerationPrompt};

pub const DEFAULT_CHUNK_SIZE: usize = 20;
const GENERATION_SCHEMA_NAME: &str = "persona_batch";

/// Input of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub segment: String,
    /// One field per line, e.g. `age: between 18 and 65`
    pub fields: String,
    pub count: usize,
    pub model: String,
    pub temperature: f32,
}

pub struct PersonaGenerator<M> {
    model: M,
    chunk_size: usize,
}

impl<M: ChatModel> PersonaGenerator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Generates up to `request.count` personas, one model call per chunk.
    ///
    /// A failing chunk is logged and skipped. Zero personas overall is a
    /// [`PanelError::Generation`].
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Persona>> {
        if request.segment.trim().is_empty() {
            return Err(PanelError::validation("Please describe the target segment"));
        }
        let fields = parse_field_specs(&request.fields);
        if fields.is_empty() {
            return Err(PanelError::validation("Please list the persona fields"));
        }
        if request.count == 0 {
            return Err(PanelError::validation("Persona count must be at least 1"));
        }

        let batches = request.count.div_ceil(self.chunk_size);
        let schema = generation_schema(&fields);
        let mut personas = Vec::with_capacity(request.count);
        let mut last_error = None;

        for batch in 0..batches {
            let wanted = (request.count - batch * self.chunk_size).min(self.chunk_size);
            let prompt = prompts::generation_user_prompt(&GenerationPrompt {
                segment: request.segment.trim(),
                fields: &fields,
                count: wanted,
                batch: batch + 1,
                batches,
            })?;

            match self
                .request_chunk(prompt, &schema, &fields, wanted, request)
                .await
            {
                Ok(chunk) => {
                    tracing::info!(
                        batch = batch + 1,
                        batches,
                        generated = chunk.len(),
                        "Generated persona chunk"
                    );
                    personas.extend(chunk);
                }
                Err(err) => {
                    tracing::warn!(batch = batch + 1, batches, "Persona chunk failed: {}", err);
                    last_error = Some(err);
                }
            }
        }

        if personas.is_empty() {
            let reason = last_error
                .map(|err| format!(": {err}"))
                .unwrap_or_default();
            return Err(PanelError::generation(format!(
                "No personas were generated{reason}"
            )));
        }
        if personas.len() < request.count {
            tracing::warn!(
                requested = request.count,
                generated = personas.len(),
                "Fewer personas than requested"
            );
        }
        Ok(personas)
    }

    async fn request_chunk(
        &self,
        prompt: String,
        schema: &Value,
        fields: &[FieldSpec],
        wanted: usize,
        request: &GenerationRequest,
    ) -> Result<Vec<Persona>> {
        let chat = ChatRequest {
            messages: vec![
                ChatMessage::system(prompts::generation_system_prompt()),
                ChatMessage::user(prompt),
            ],
            model: request.model.clone(),
            temperature: request.temperature,
            response_format: Some(ResponseFormat::strict_schema(
                GENERATION_SCHEMA_NAME,
                schema.clone(),
            )),
        };

        let raw = self
            .model
            .call(chat)
            .await
            .map_err(|err| PanelError::generation(err.to_string()))?;
        let mut envelope =
            decode_object(&raw).map_err(|err| PanelError::generation(err.to_string()))?;

        let items = match envelope.remove("personas") {
            Some(Value::Array(items)) => items,
            _ => return Err(PanelError::generation("reply has no 'personas' array")),
        };

        let mut personas = Vec::with_capacity(wanted);
        for item in items.into_iter().take(wanted) {
            match item {
                Value::Object(record) => personas.push(normalize_record(record, fields)?),
                other => tracing::warn!("Skipping non-object persona entry: {}", other),
            }
        }
        Ok(personas)
    }
}

/// Parses the field list, one field per line.
///
/// The name is the text before the first `:` or ` (`; the remainder is kept
/// as a hint for the model. Leading list bullets are ignored and duplicate
/// names are dropped.
pub fn parse_field_specs(text: &str) -> Vec<FieldSpec> {
    let mut specs: Vec<FieldSpec> = Vec::new();
    for line in text.lines() {
        let line = line
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim();
        if line.is_empty() {
            continue;
        }

        let colon = line.find(':');
        let paren = line.find(" (");
        let (name, hint) = match (colon, paren) {
            (Some(c), Some(p)) if p < c => split_paren(line, p),
            (Some(c), _) => (&line[..c], line[c + 1..].trim()),
            (None, Some(p)) => split_paren(line, p),
            (None, None) => (line, ""),
        };

        let name = name.trim();
        if name.is_empty() || specs.iter().any(|spec| spec.name == name) {
            continue;
        }
        specs.push(FieldSpec {
            name: name.to_string(),
            hint: (!hint.is_empty()).then(|| hint.to_string()),
        });
    }
    specs
}

fn split_paren(line: &str, at: usize) -> (&str, &str) {
    let hint = line[at..]
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    (&line[..at], hint)
}

fn generation_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        properties.insert(
            field.name.clone(),
            json!({
                "type": ["string", "number", "boolean"],
                "description": field.hint.as_deref().unwrap_or(&field.name),
            }),
        );
    }
    let required: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();

    json!({
        "type": "object",
        "properties": {
            "personas": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false
                }
            }
        },
        "required": ["personas"],
        "additionalProperties": false
    })
}

/// Orders a model record by the requested fields. Missing fields become
/// null, nested values are flattened to their JSON text, extra keys are
/// dropped.
fn normalize_record(mut record: Map<String, Value>, fields: &[FieldSpec]) -> Result<Persona> {
    let mut normalized = Map::new();
    for field in fields {
        let value = match record.shift_remove(&field.name) {
            Some(value) => value,
            None => {
                let key = record
                    .keys()
                    .find(|key| key.eq_ignore_ascii_case(&field.name))
                    .cloned();
                key.and_then(|key| record.shift_remove(&key))
                    .unwrap_or(Value::Null)
            }
        };
        let value = match value {
            Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
            scalar => scalar,
        };
        normalized.insert(field.name.clone(), value);
    }
    Persona::from_map(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ModelCallError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with one scripted response per call, in order.
    struct QueueModel {
        replies: Mutex<Vec<std::result::Result<String, ModelCallError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl QueueModel {
        fn new(mut replies: Vec<std::result::Result<String, ModelCallError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for QueueModel {
        async fn call(
            &self,
            request: ChatRequest,
        ) -> std::result::Result<String, ModelCallError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[1].content.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(ModelCallError::EmptyResponse))
        }
    }

    fn people(names: &[&str]) -> String {
        let personas: Vec<Value> = names
            .iter()
            .map(|name| json!({"Name": name, "age": 30, "hobbies": ["chess"]}))
            .collect();
        json!({"personas": personas}).to_string()
    }

    fn request(count: usize) -> GenerationRequest {
        GenerationRequest {
            segment: "Retired gardeners".into(),
            fields: "name: full name\nage (years)\nhobbies\ncity".into(),
            count,
            model: "m".into(),
            temperature: 0.9,
        }
    }

    #[test]
    fn field_names_stop_at_colon_or_paren() {
        let specs = parse_field_specs("- name: full name\n* age (18-65)\n\nincome: yearly (USD)\nname");
        let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, ["name", "age", "income"]);
        assert_eq!(specs[1].hint.as_deref(), Some("18-65"));
        assert_eq!(specs[2].hint.as_deref(), Some("yearly (USD)"));
    }

    #[test]
    fn schema_requires_every_field() {
        let schema = generation_schema(&parse_field_specs("name\nage"));
        let items = &schema["properties"]["personas"]["items"];
        assert_eq!(items["required"], json!(["name", "age"]));
        assert_eq!(items["additionalProperties"], json!(false));
    }

    #[tokio::test]
    async fn chunks_are_requested_sequentially_and_normalized() {
        let model = QueueModel::new(vec![Ok(people(&["Ann", "Bea"])), Ok(people(&["Cat"]))]);
        let generator = PersonaGenerator::new(model).with_chunk_size(2);

        let personas = generator.generate(&request(3)).await.unwrap();
        assert_eq!(personas.len(), 3);
        let keys: Vec<&String> = personas[0].keys().collect();
        assert_eq!(keys, ["name", "age", "hobbies", "city"]);
        assert_eq!(personas[2].get("name"), Some(&json!("Cat")));
        assert_eq!(personas[0].get("hobbies"), Some(&json!("[\"chess\"]")));
        assert_eq!(personas[0].get("city"), Some(&Value::Null));

        let prompts = generator.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Create 2 distinct personas"));
        assert!(prompts[1].contains("Create 1 distinct personas"));
    }

    #[tokio::test]
    async fn failed_chunk_is_skipped() {
        let model = QueueModel::new(vec![Ok("not json".into()), Ok(people(&["Dan", "Eve"]))]);
        let generator = PersonaGenerator::new(model).with_chunk_size(2);
        let personas = generator.generate(&request(4)).await.unwrap();
        assert_eq!(personas.len(), 2);
    }

    #[tokio::test]
    async fn nothing_generated_is_an_error() {
        let generator = PersonaGenerator::new(QueueModel::new(vec![]));
        let err = generator.generate(&request(3)).await.unwrap_err();
        assert!(matches!(err, PanelError::Generation(_)));
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected() {
        let generator = PersonaGenerator::new(QueueModel::new(vec![]));
        let mut blank = request(3);
        blank.fields = "  \n".into();
        assert!(matches!(
            generator.generate(&blank).await,
            Err(PanelError::Validation(_))
        ));
    }
}
