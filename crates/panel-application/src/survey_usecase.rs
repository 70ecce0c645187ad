//! Survey use case.
//!
//! Coordinates persona generation, participant sampling and the batch
//! scheduler around an explicit [`SurveySession`].

use std::sync::Arc;
use std::time::Duration;

use panel_core::config::{GenerationSettings, SurveySettings};
use panel_core::persona::{PersonaRepository, select_indices};
use panel_core::{PanelError, Result};
use panel_execution::{BatchScheduler, DEFAULT_HEARTBEAT, ProgressSink, RunReport, SurveyRun};
use panel_interaction::{AnswerClient, ChatModel, GenerationRequest, PersonaGenerator};

use crate::survey_session::SurveySession;

/// Parameters of one survey run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Participants to sample; capped at the population size
    pub participants: usize,
    pub model: String,
    pub temperature: f32,
    /// Batches run concurrently
    pub batch_count: usize,
    pub heartbeat: Duration,
}

impl RunOptions {
    /// Builds options from `[survey]` settings, falling back to
    /// `default_model` when the settings name none.
    pub fn from_settings(settings: &SurveySettings, default_model: &str) -> Self {
        Self {
            participants: settings.participants,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            temperature: settings.temperature,
            batch_count: settings.max_concurrent_batches,
            heartbeat: Duration::from_millis(settings.heartbeat_ms),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        let defaults = SurveySettings::default();
        Self {
            participants: defaults.participants,
            model: String::new(),
            temperature: defaults.temperature,
            batch_count: defaults.max_concurrent_batches,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

pub struct SurveyUseCase<M> {
    model: Arc<M>,
    generation_chunk_size: usize,
}

impl<M: ChatModel> SurveyUseCase<M> {
    pub fn new(model: M) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<M>) -> Self {
        Self {
            model,
            generation_chunk_size: GenerationSettings::default().chunk_size,
        }
    }

    pub fn with_generation_chunk_size(mut self, chunk_size: usize) -> Self {
        self.generation_chunk_size = chunk_size;
        self
    }

    /// Generates a population for the request's segment and loads it into
    /// the session. Returns the number of personas generated.
    pub async fn generate_personas(
        &self,
        session: &mut SurveySession,
        request: &GenerationRequest,
    ) -> Result<usize> {
        let generator = PersonaGenerator::new(Arc::clone(&self.model))
            .with_chunk_size(self.generation_chunk_size);
        let personas = generator.generate(request).await?;
        let generated = personas.len();

        session.set_segment(request.segment.clone(), request.fields.clone());
        session.load_personas(personas)?;
        tracing::info!(
            session_id = %session.id(),
            requested = request.count,
            generated,
            "Personas generated"
        );
        Ok(generated)
    }

    /// Loads the population from a repository into the session.
    pub async fn load_personas(
        &self,
        session: &mut SurveySession,
        repository: &dyn PersonaRepository,
    ) -> Result<usize> {
        let personas = repository.get_all().await?;
        let loaded = personas.len();
        session.load_personas(personas)?;
        Ok(loaded)
    }

    /// Samples participants, runs the survey and records the results.
    ///
    /// Missing personas or questions abort before any model call.
    pub async fn run_survey<P>(
        &self,
        session: &mut SurveySession,
        options: &RunOptions,
        progress: &P,
    ) -> Result<RunReport>
    where
        P: ProgressSink + ?Sized,
    {
        if session.personas().is_empty() {
            return Err(PanelError::validation("Please generate personas first"));
        }
        let Some(schema) = session.schema() else {
            return Err(PanelError::parse("Please enter valid survey questions"));
        };
        if options.participants == 0 {
            return Err(PanelError::validation(
                "Number of participants must be at least 1",
            ));
        }

        let population = session.personas();
        let participants: Vec<_> = select_indices(population.len(), options.participants)
            .into_iter()
            .map(|index| population[index].clone())
            .collect();
        if participants.len() < options.participants {
            tracing::info!(
                requested = options.participants,
                available = population.len(),
                "Participant count capped at population size"
            );
        }

        let client = AnswerClient::new(Arc::clone(&self.model));
        let report = BatchScheduler::new(&client)
            .with_heartbeat(options.heartbeat)
            .run(
                SurveyRun {
                    participants: &participants,
                    questions: session.questions(),
                    schema,
                    model: &options.model,
                    temperature: options.temperature,
                    batch_count: options.batch_count,
                },
                progress,
            )
            .await;

        if report.results.is_empty() {
            tracing::warn!(
                session_id = %session.id(),
                requested = report.requested,
                "Survey run produced no results"
            );
        }
        session.record_results(report.results.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use panel_execution::NoProgress;
    use panel_interaction::{ChatRequest, ModelCallError};

    struct UnreachableModel;

    #[async_trait]
    impl ChatModel for UnreachableModel {
        async fn call(&self, _request: ChatRequest) -> std::result::Result<String, ModelCallError> {
            panic!("no model call expected");
        }
    }

    #[tokio::test]
    async fn run_without_personas_is_rejected() {
        let use_case = SurveyUseCase::new(UnreachableModel);
        let mut session = SurveySession::new();
        session.set_questions("Coffee?\n(Yes / No)").unwrap();

        let err = use_case
            .run_survey(&mut session, &RunOptions::default(), &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PanelError::Validation("Please generate personas first".into())
        );
    }

    #[tokio::test]
    async fn run_without_questions_is_rejected() {
        let use_case = SurveyUseCase::new(UnreachableModel);
        let mut session = SurveySession::new();
        let persona =
            panel_core::persona::Persona::from_value(serde_json::json!({"name": "a"})).unwrap();
        session.load_personas(vec![persona]).unwrap();

        let err = use_case
            .run_survey(&mut session, &RunOptions::default(), &NoProgress)
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn options_follow_settings() {
        let settings = SurveySettings {
            participants: 8,
            heartbeat_ms: 500,
            ..SurveySettings::default()
        };
        let options = RunOptions::from_settings(&settings, "openai/gpt-4o-mini");
        assert_eq!(options.participants, 8);
        assert_eq!(options.model, "openai/gpt-4o-mini");
        assert_eq!(options.heartbeat, Duration::from_millis(500));
        assert_eq!(options.batch_count, settings.max_concurrent_batches);
    }
}
