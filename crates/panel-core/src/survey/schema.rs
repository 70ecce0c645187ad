//! Structured-output schema for survey answers.
//!
//! For question index `i` (0-based) the schema declares `question_{i+1}`,
//! restricted to that question's options in declared order, and
//! `question_{i+1}_reasoning` as free text. Every field is required and no
//! other properties are allowed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::question::{Question, question_key, reasoning_key};
use crate::error::{PanelError, Result};

/// Name under which the schema is registered in strict response formats.
pub const SCHEMA_NAME: &str = "survey_response";

/// Kind of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Answer restricted to an enumerated domain
    Choice { options: Vec<String> },
    /// Unconstrained reasoning text
    Reasoning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Response schema derived from a question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySchema {
    fields: Vec<SchemaField>,
}

/// Builds the response schema for a question list.
///
/// Fails with [`PanelError::Schema`] when the list is empty or when any
/// question has no options to enumerate.
pub fn build_schema(questions: &[Question]) -> Result<SurveySchema> {
    if questions.is_empty() {
        return Err(PanelError::schema("Please enter valid survey questions"));
    }

    let mut fields = Vec::with_capacity(questions.len() * 2);
    for (index, question) in questions.iter().enumerate() {
        if question.is_open_ended() {
            return Err(PanelError::schema(format!(
                "Please enter valid survey questions: question {} (\"{}\") has no answer options",
                index + 1,
                question.text
            )));
        }
        fields.push(SchemaField {
            name: question_key(index),
            description: question.text.clone(),
            kind: FieldKind::Choice {
                options: question.options.clone(),
            },
        });
        fields.push(SchemaField {
            name: reasoning_key(index),
            description: format!("Reasoning for the answer to: {}", question.text),
            kind: FieldKind::Reasoning,
        });
    }

    Ok(SurveySchema { fields })
}

impl SurveySchema {
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn question_count(&self) -> usize {
        self.fields.len() / 2
    }

    /// Enumerated domain of the answer field for a 0-based question index.
    pub fn options(&self, question_index: usize) -> Option<&[String]> {
        match &self.fields.get(question_index * 2)?.kind {
            FieldKind::Choice { options } => Some(options),
            FieldKind::Reasoning => None,
        }
    }

    /// Names of every required field, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Renders the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::Choice { options } => json!({
                    "type": "string",
                    "description": field.description,
                    "enum": options,
                }),
                FieldKind::Reasoning => json!({
                    "type": "string",
                    "description": field.description,
                }),
            };
            properties.insert(field.name.clone(), property);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
            "additionalProperties": false,
        })
    }

    /// Lists problems of a decoded answer object against this schema.
    ///
    /// An empty list means the answers conform. Problems are informational:
    /// out-of-domain answers are still recorded, and tallies count them as
    /// unmatched.
    pub fn check_answers(&self, answers: &Map<String, Value>) -> Vec<String> {
        let mut problems = Vec::new();
        for field in &self.fields {
            match (answers.get(&field.name), &field.kind) {
                (None, _) => problems.push(format!("missing field '{}'", field.name)),
                (Some(Value::String(answer)), FieldKind::Choice { options }) => {
                    if !options.contains(answer) {
                        problems.push(format!(
                            "'{}' is not an allowed answer for '{}'",
                            answer, field.name
                        ));
                    }
                }
                (Some(Value::String(_)), FieldKind::Reasoning) => {}
                (Some(_), _) => problems.push(format!("field '{}' is not a string", field.name)),
            }
        }
        for key in answers.keys() {
            if !self.fields.iter().any(|field| &field.name == key) {
                problems.push(format!("unexpected field '{key}'"));
            }
        }
        problems
    }

    /// Keeps only the fields this schema declares, in declaration order.
    ///
    /// Returns the retained answers and the names of the dropped keys.
    pub fn retain_declared(
        &self,
        mut answers: Map<String, Value>,
    ) -> (Map<String, Value>, Vec<String>) {
        let mut kept = Map::new();
        for field in &self.fields {
            if let Some(value) = answers.shift_remove(&field.name) {
                kept.insert(field.name.clone(), value);
            }
        }
        (kept, answers.into_iter().map(|(key, _)| key).collect())
    }
}
