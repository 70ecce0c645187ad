//! Persona domain model.
//!
//! A persona is one synthetic survey respondent. Its attribute set is not
//! known at compile time: the segment author chooses the fields, so a persona
//! is an ordered map from field name to a scalar JSON value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PanelError, Result};

/// One synthetic individual consumed as a survey participant.
///
/// Field order is preserved as loaded. The first persona of a population
/// defines the table header for that population (see [`fields_of_first`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Persona {
    fields: Map<String, Value>,
}

impl Persona {
    /// Builds a persona from an ordered field map.
    ///
    /// Values must be scalars (string, number, bool or null); nested arrays
    /// and objects are rejected so every field can be shown, filtered and
    /// exported as a single cell.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        if let Some((key, _)) = fields.iter().find(|(_, value)| !is_scalar(value)) {
            return Err(PanelError::validation(format!(
                "persona field '{key}' must be a scalar value"
            )));
        }
        Ok(Self { fields })
    }

    /// Builds a persona from a JSON value that must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(PanelError::validation(format!(
                "persona record must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the display form of a field, if present.
    pub fn get_display(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(display_value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Renders the persona as `key: value` lines for prompts.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{}: {}", key, display_value(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<Map<String, Value>> for Persona {
    type Error = PanelError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<Persona> for Map<String, Value> {
    fn from(persona: Persona) -> Self {
        persona.fields
    }
}

/// Returns the field names of the first persona, which define the header of
/// a population. Empty when there are no personas.
pub fn fields_of_first(personas: &[Persona]) -> Vec<String> {
    personas
        .first()
        .map(|persona| persona.keys().cloned().collect())
        .unwrap_or_default()
}

/// Checks that every persona carries exactly the header's field set.
///
/// Returns the header on success. Key order may differ between personas;
/// only the set is compared.
pub fn uniform_fields(personas: &[Persona]) -> Result<Vec<String>> {
    let header = fields_of_first(personas);
    for (index, persona) in personas.iter().enumerate().skip(1) {
        let missing = header.iter().find(|field| persona.get(field).is_none());
        let extra = persona.keys().find(|key| !header.contains(key));
        if let Some(field) = missing.or(extra) {
            return Err(PanelError::validation(format!(
                "persona {} does not match the field set of the first persona (field '{}')",
                index + 1,
                field
            )));
        }
    }
    Ok(header)
}

/// String form used for display, filtering and CSV export.
///
/// Strings are shown without quotes, null as an empty string, and numbers
/// and booleans in their JSON form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
