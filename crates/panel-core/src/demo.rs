//! Demo snapshot format.
//!
//! A snapshot captures a finished session (segment, fields, questions,
//! personas and results) so the pipeline can be seeded without any model
//! call. `generated_code` is carried for compatibility with older snapshots
//! and is never executed.

use serde::{Deserialize, Serialize};

use crate::persona::Persona;
use crate::survey::SurveyResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoSnapshot {
    #[serde(default, alias = "segmentDescription")]
    pub segment_description: String,
    /// Requested persona fields, one per line as typed by the user
    #[serde(default, alias = "fieldsList")]
    pub fields: String,
    #[serde(default, alias = "questionsText", alias = "surveyQuestions")]
    pub questions_text: String,
    #[serde(default, alias = "generatedCode", skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,
    #[serde(default)]
    pub personas: Vec<Persona>,
    #[serde(default, alias = "surveyResults")]
    pub survey_results: Vec<SurveyResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_snapshots() {
        let text = r#"{
            "segmentDescription": "Urban commuters",
            "fieldsList": "age\ncity",
            "surveyQuestions": "Bike?\n(Yes / No)",
            "generatedCode": "function generatePersonas() { return []; }",
            "personas": [{"age": 30, "city": "X"}],
            "surveyResults": [{"participant_id": 1, "age": 30, "city": "X", "question_1": "Yes"}]
        }"#;
        let snapshot: DemoSnapshot = serde_json::from_str(text).unwrap();
        assert_eq!(snapshot.segment_description, "Urban commuters");
        assert_eq!(snapshot.personas.len(), 1);
        assert_eq!(snapshot.survey_results[0].participant_id, 1);
        assert!(snapshot.generated_code.is_some());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot: DemoSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.personas.is_empty());
        assert!(snapshot.questions_text.is_empty());
    }
}
