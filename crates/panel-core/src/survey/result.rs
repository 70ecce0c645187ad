//! Survey result records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::question::{is_answer_field, question_key};
use crate::error::{PanelError, Result};
use crate::persona::{Persona, display_value};

/// Field carrying the run-global participant id.
pub const PARTICIPANT_ID: &str = "participant_id";

/// Decoded answer object for one participant (`question_<i>` and
/// `question_<i>_reasoning` fields).
pub type AnswerMap = Map<String, Value>;

/// One participant's answers together with the persona that gave them.
///
/// Serialized as a single flat record: `participant_id` first, then persona
/// fields, then answer fields. An answer field overrides a persona field of
/// the same name; neither can override `participant_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SurveyResult {
    pub participant_id: u32,
    pub persona: Persona,
    pub answers: AnswerMap,
}

impl SurveyResult {
    pub fn new(participant_id: u32, persona: Persona, answers: AnswerMap) -> Self {
        Self {
            participant_id,
            persona,
            answers,
        }
    }

    /// Answer given to a 0-based question index, in display form.
    pub fn answer(&self, question_index: usize) -> Option<String> {
        self.answers.get(&question_key(question_index)).map(display_value)
    }

    /// Display form of any record field, including `participant_id`.
    pub fn field_display(&self, field: &str) -> Option<String> {
        if field == PARTICIPANT_ID {
            return Some(self.participant_id.to_string());
        }
        self.answers
            .get(field)
            .or_else(|| self.persona.get(field))
            .map(display_value)
    }

    /// Flattens the result into one ordered record.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(PARTICIPANT_ID.to_string(), Value::from(self.participant_id));
        let fields = self.persona.iter().chain(self.answers.iter());
        for (key, value) in fields.filter(|(key, _)| key.as_str() != PARTICIPANT_ID) {
            record.insert(key.clone(), value.clone());
        }
        record
    }

    /// Splits a flat record back into id, persona and answers.
    ///
    /// `participant_id` may be a JSON number or a numeric string (as in a
    /// re-parsed CSV export).
    pub fn from_record(mut record: Map<String, Value>) -> Result<Self> {
        let participant_id = match record.shift_remove(PARTICIPANT_ID) {
            Some(Value::Number(n)) => n.as_u64().and_then(|id| u32::try_from(id).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            PanelError::validation("survey result record needs a positive integer participant_id")
        })?;

        let mut persona_fields = Map::new();
        let mut answers = Map::new();
        for (key, value) in record {
            if is_answer_field(&key) {
                answers.insert(key, value);
            } else {
                persona_fields.insert(key, value);
            }
        }

        Ok(Self {
            participant_id,
            persona: Persona::from_map(persona_fields)?,
            answers,
        })
    }
}

impl TryFrom<Map<String, Value>> for SurveyResult {
    type Error = PanelError;

    fn try_from(record: Map<String, Value>) -> Result<Self> {
        Self::from_record(record)
    }
}

impl From<SurveyResult> for Map<String, Value> {
    fn from(result: SurveyResult) -> Self {
        result.to_record()
    }
}

/// Sorts results by ascending participant id.
pub fn sort_by_participant(results: &mut [SurveyResult]) {
    results.sort_by_key(|result| result.participant_id);
}
