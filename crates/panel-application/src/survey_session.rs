//! Survey session context.
//!
//! Holds everything a survey works on: the persona population, the parsed
//! questions with their schema, and the latest results. The session is an
//! explicit value passed to use cases; there is no shared global state.

use chrono::{DateTime, Utc};
use panel_core::analysis::{self, Analysis, FilterSet, candidate_filter_fields, filter_values};
use panel_core::demo::DemoSnapshot;
use panel_core::persona::{Persona, uniform_fields};
use panel_core::survey::{Question, SurveyResult, SurveySchema, build_schema, parse_questions};
use panel_core::{PanelError, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SurveySession {
    id: Uuid,
    created_at: DateTime<Utc>,
    segment: String,
    fields: String,
    personas: Vec<Persona>,
    questions_text: String,
    questions: Vec<Question>,
    schema: Option<SurveySchema>,
    results: Vec<SurveyResult>,
    generated_code: Option<String>,
}

impl Default for SurveySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            segment: String::new(),
            fields: String::new(),
            personas: Vec::new(),
            questions_text: String::new(),
            questions: Vec::new(),
            schema: None,
            results: Vec::new(),
            generated_code: None,
        }
    }

    /// Rebuilds a session from a demo snapshot without any model call.
    pub fn from_snapshot(snapshot: DemoSnapshot) -> Result<Self> {
        let mut session = Self::new();
        session.set_segment(snapshot.segment_description, snapshot.fields);
        session.load_personas(snapshot.personas)?;
        if !snapshot.questions_text.trim().is_empty() {
            session.set_questions(&snapshot.questions_text)?;
        }
        session.record_results(snapshot.survey_results);
        session.generated_code = snapshot.generated_code;

        tracing::info!(
            session_id = %session.id,
            personas = session.personas.len(),
            results = session.results.len(),
            "Session restored from snapshot"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn fields(&self) -> &str {
        &self.fields
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn questions_text(&self) -> &str {
        &self.questions_text
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn schema(&self) -> Option<&SurveySchema> {
        self.schema.as_ref()
    }

    pub fn results(&self) -> &[SurveyResult] {
        &self.results
    }

    pub fn set_segment(&mut self, segment: impl Into<String>, fields: impl Into<String>) {
        self.segment = segment.into();
        self.fields = fields.into();
    }

    /// Replaces the population. Every persona must carry the field set of
    /// the first one. Results of the previous population are discarded.
    pub fn load_personas(&mut self, personas: Vec<Persona>) -> Result<()> {
        let fields = uniform_fields(&personas)?;
        tracing::debug!(
            session_id = %self.id,
            personas = personas.len(),
            fields = fields.len(),
            "Loaded personas"
        );
        self.personas = personas;
        self.results.clear();
        Ok(())
    }

    /// Parses the question text and builds its schema.
    ///
    /// The session is left untouched when either step fails.
    pub fn set_questions(&mut self, text: &str) -> Result<()> {
        let questions = parse_questions(text)?;
        let schema = build_schema(&questions)?;
        self.questions_text = text.to_string();
        self.questions = questions;
        self.schema = Some(schema);
        Ok(())
    }

    /// Replaces the results with those of the latest run.
    pub fn record_results(&mut self, results: Vec<SurveyResult>) {
        self.results = results;
    }

    /// Filters the results and tallies every question.
    pub fn analyze(&self, filters: &FilterSet) -> Result<Analysis<'_>> {
        if self.questions.is_empty() {
            return Err(PanelError::parse("Please enter valid survey questions"));
        }
        analysis::analyze(&self.results, &self.questions, filters)
    }

    /// Persona fields usable as filters, with their selectable values.
    pub fn filter_options(&self) -> Vec<(String, Vec<String>)> {
        candidate_filter_fields(&self.results)
            .into_iter()
            .map(|field| {
                let values = filter_values(&self.results, &field);
                (field, values)
            })
            .collect()
    }

    /// Clears the population, the questions and the results.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Self::new();
        self.id = id;
        tracing::info!(session_id = %id, "Session reset");
    }

    pub fn to_snapshot(&self) -> DemoSnapshot {
        DemoSnapshot {
            segment_description: self.segment.clone(),
            fields: self.fields.clone(),
            questions_text: self.questions_text.clone(),
            generated_code: self.generated_code.clone(),
            personas: self.personas.clone(),
            survey_results: self.results.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn persona(name: &str, city: &str) -> Persona {
        Persona::from_value(json!({"name": name, "city": city})).unwrap()
    }

    fn result(id: u32, city: &str, answer: &str) -> SurveyResult {
        let answers = json!({"question_1": answer, "question_1_reasoning": "r"});
        SurveyResult::new(
            id,
            persona(&format!("p{id}"), city),
            answers.as_object().unwrap().clone(),
        )
    }

    fn snapshot() -> DemoSnapshot {
        DemoSnapshot {
            segment_description: "Commuters".into(),
            fields: "name\ncity".into(),
            questions_text: "Bike to work?\n(Yes / No)".into(),
            generated_code: None,
            personas: vec![persona("p1", "Oslo"), persona("p2", "Rome")],
            survey_results: vec![result(1, "Oslo", "Yes"), result(2, "Rome", "No")],
        }
    }

    #[test]
    fn snapshot_round_trip_analyzes_without_a_model() {
        let session = SurveySession::from_snapshot(snapshot()).unwrap();
        assert_eq!(session.questions().len(), 1);

        let analysis = session.analyze(&FilterSet::new()).unwrap();
        assert_eq!(analysis.rows.len(), 2);
        assert_eq!(analysis.tallies[0].get("Yes"), 1);

        let filtered = session
            .analyze(&FilterSet::new().with("city", "Rome"))
            .unwrap();
        assert_eq!(filtered.tallies[0].get("No"), 1);
        assert_eq!(filtered.tallies[0].get("Yes"), 0);

        assert_eq!(session.to_snapshot(), snapshot());
    }

    #[test]
    fn bad_questions_leave_state_untouched() {
        let mut session = SurveySession::from_snapshot(snapshot()).unwrap();
        let err = session.set_questions("   \n").unwrap_err();
        assert!(err.is_parse());
        let err = session.set_questions("What do you think?").unwrap_err();
        assert!(err.is_schema());
        assert_eq!(session.questions_text(), "Bike to work?\n(Yes / No)");
        assert!(session.schema().is_some());
    }

    #[test]
    fn mismatched_personas_are_rejected() {
        let mut session = SurveySession::new();
        let odd = Persona::from_value(json!({"name": "x"})).unwrap();
        assert!(session.load_personas(vec![persona("a", "Oslo"), odd]).is_err());
        assert!(session.personas().is_empty());
    }

    #[test]
    fn new_population_discards_results() {
        let mut session = SurveySession::from_snapshot(snapshot()).unwrap();
        session.load_personas(vec![persona("p9", "Lima")]).unwrap();
        assert!(session.results().is_empty());
        assert!(session.analyze(&FilterSet::new()).unwrap_err().is_aggregation());
    }

    #[test]
    fn filter_options_list_persona_fields() {
        let session = SurveySession::from_snapshot(snapshot()).unwrap();
        let options = session.filter_options();
        assert!(options.contains(&("city".to_string(), vec!["Oslo".into(), "Rome".into()])));
    }

    #[test]
    fn reset_keeps_identity_only() {
        let mut session = SurveySession::from_snapshot(snapshot()).unwrap();
        let id = session.id();
        session.reset();
        assert_eq!(session.id(), id);
        assert!(session.personas().is_empty());
        assert!(session.questions().is_empty());
        assert!(session.schema().is_none());
    }
}
