//! Concurrent batch execution of a survey run.
//!
//! Participants are split into contiguous batches. All batches are polled
//! concurrently from one task; inside a batch, participants are answered
//! strictly one after another. A heartbeat interval shares the same
//! `select!` loop, so progress is reported without spawning or locking.

use std::ops::Range;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use panel_core::PanelError;
use panel_core::persona::Persona;
use panel_core::survey::{Question, SurveyResult, SurveySchema, sort_by_participant};
use panel_interaction::{AnswerClient, AnswerError, ChatModel};
use tokio::time::MissedTickBehavior;

use crate::progress::{BatchFailure, ProgressSink, ProgressUpdate, RunReport};

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(2);

/// Everything one run needs besides the model.
#[derive(Debug, Clone, Copy)]
pub struct SurveyRun<'a> {
    pub participants: &'a [Persona],
    pub questions: &'a [Question],
    pub schema: &'a SurveySchema,
    pub model: &'a str,
    pub temperature: f32,
    /// Requested number of batches; clamped to `[1, participants]`
    pub batch_count: usize,
}

/// Contiguous participant ranges and the batch size they were cut with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub per_batch: usize,
    pub ranges: Vec<Range<usize>>,
}

impl BatchPlan {
    /// Splits `total` participants into at most `batch_count` batches of
    /// `ceil(total / batch_count)`. Trailing empty batches are omitted.
    pub fn new(total: usize, batch_count: usize) -> Self {
        if total == 0 {
            return Self {
                per_batch: 0,
                ranges: Vec::new(),
            };
        }
        let batch_count = batch_count.clamp(1, total);
        let per_batch = total.div_ceil(batch_count);
        let ranges = (0..total)
            .step_by(per_batch)
            .map(|start| start..(start + per_batch).min(total))
            .collect();
        Self { per_batch, ranges }
    }

    /// 1-based participant id of a batch member.
    pub fn participant_id(&self, batch_index: usize, in_batch_index: usize) -> u32 {
        (batch_index * self.per_batch + in_batch_index + 1) as u32
    }
}

struct BatchOutcome {
    batch_index: usize,
    results: Vec<SurveyResult>,
    attempted: usize,
    decode_failures: usize,
    failure: Option<BatchFailure>,
}

pub struct BatchScheduler<'c, M> {
    client: &'c AnswerClient<M>,
    heartbeat: Option<Duration>,
}

impl<'c, M: ChatModel> BatchScheduler<'c, M> {
    pub fn new(client: &'c AnswerClient<M>) -> Self {
        Self {
            client,
            heartbeat: Some(DEFAULT_HEARTBEAT),
        }
    }

    /// Sets the heartbeat interval. A zero interval disables heartbeats.
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = (!heartbeat.is_zero()).then_some(heartbeat);
        self
    }

    /// Runs every batch to completion and returns the merged results.
    ///
    /// Batch failures are contained: a decode failure skips one participant,
    /// a transport failure drops its whole batch. The report states how many
    /// participants were requested and how many produced a result.
    pub async fn run<P>(&self, run: SurveyRun<'_>, progress: &P) -> RunReport
    where
        P: ProgressSink + ?Sized,
    {
        let total = run.participants.len();
        let plan = BatchPlan::new(total, run.batch_count);
        if plan.ranges.is_empty() {
            return RunReport::empty();
        }

        tracing::info!(
            participants = total,
            batches = plan.ranges.len(),
            per_batch = plan.per_batch,
            model = run.model,
            "Starting survey run"
        );

        let mut pending: FuturesUnordered<_> = plan
            .ranges
            .iter()
            .enumerate()
            .map(|(batch_index, range)| {
                self.run_batch(&plan, batch_index, &run.participants[range.clone()], run)
            })
            .collect();

        let started = Instant::now();
        let beating = self.heartbeat.is_some();
        let mut heartbeat = tokio::time::interval(self.heartbeat.unwrap_or(DEFAULT_HEARTBEAT));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        heartbeat.tick().await;

        let mut report = RunReport {
            requested: total,
            ..RunReport::empty()
        };

        loop {
            tokio::select! {
                outcome = pending.next() => {
                    let Some(outcome) = outcome else { break };
                    let batch_results = outcome.results.len();
                    report.attempted += outcome.attempted;
                    report.decode_failures += outcome.decode_failures;
                    report.results.extend(outcome.results);
                    if let Some(failure) = outcome.failure {
                        report.failed_batches.push(failure);
                    }
                    progress.report(ProgressUpdate::BatchCompleted {
                        batch_index: outcome.batch_index,
                        batch_results,
                        completed: report.results.len(),
                        total,
                    });
                }
                _ = heartbeat.tick(), if beating => {
                    progress.report(ProgressUpdate::StillWorking {
                        completed: report.results.len(),
                        total,
                        elapsed: started.elapsed(),
                    });
                }
            }
        }

        sort_by_participant(&mut report.results);
        report.failed_batches.sort_by_key(|failure| failure.batch_index);

        tracing::info!(
            requested = report.requested,
            produced = report.produced(),
            failed_batches = report.failed_batches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Survey run finished"
        );
        report
    }

    async fn run_batch(
        &self,
        plan: &BatchPlan,
        batch_index: usize,
        members: &[Persona],
        run: SurveyRun<'_>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            batch_index,
            results: Vec::with_capacity(members.len()),
            attempted: 0,
            decode_failures: 0,
            failure: None,
        };

        for (in_batch_index, persona) in members.iter().enumerate() {
            let participant_id = plan.participant_id(batch_index, in_batch_index);
            outcome.attempted += 1;

            let answer = self
                .client
                .answer(persona, run.questions, run.schema, run.model, run.temperature)
                .await;

            match answer {
                Ok(answers) => {
                    let problems = run.schema.check_answers(&answers);
                    if !problems.is_empty() {
                        tracing::warn!(
                            batch_index,
                            participant_id,
                            "Answers do not match the schema: {}",
                            problems.join("; ")
                        );
                    }
                    let (answers, dropped) = run.schema.retain_declared(answers);
                    if !dropped.is_empty() {
                        tracing::debug!(
                            batch_index,
                            participant_id,
                            "Dropping undeclared answer fields: {}",
                            dropped.join(", ")
                        );
                    }
                    tracing::debug!(batch_index, participant_id, "Participant answered");
                    outcome
                        .results
                        .push(SurveyResult::new(participant_id, persona.clone(), answers));
                }
                Err(AnswerError::Decode { message, excerpt }) => {
                    let error = PanelError::AnswerDecode {
                        participant_id,
                        message,
                    };
                    tracing::warn!(
                        batch_index,
                        participant_id,
                        excerpt = %excerpt,
                        "Skipping participant: {}",
                        error
                    );
                    outcome.decode_failures += 1;
                }
                Err(AnswerError::Transport(err)) => {
                    let failure = BatchFailure {
                        batch_index,
                        participants: members.len(),
                        message: err.to_string(),
                    };
                    tracing::error!(
                        batch_index,
                        participant_id,
                        dropped = outcome.results.len(),
                        "{}",
                        PanelError::from(&failure)
                    );
                    outcome.results.clear();
                    outcome.failure = Some(failure);
                    break;
                }
            }
        }

        tracing::info!(
            batch_index,
            results = outcome.results.len(),
            "Batch completed"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use panel_core::survey::{build_schema, parse_questions};
    use panel_interaction::{ChatRequest, ModelCallError};
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers "Yes" unless the persona's name says otherwise. Personas
    /// named `slow...` take four times the base delay.
    struct NameDrivenModel {
        delay: Duration,
    }

    #[async_trait]
    impl ChatModel for NameDrivenModel {
        async fn call(&self, request: ChatRequest) -> Result<String, ModelCallError> {
            let persona = &request.messages[0].content;
            let delay = if persona.contains("name: slow") {
                self.delay * 4
            } else {
                self.delay
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if persona.contains("name: offline") {
                return Err(ModelCallError::Transport {
                    message: "connection refused".into(),
                    is_retryable: true,
                });
            }
            if persona.contains("name: garbled") {
                return Ok("I would rather not say".into());
            }
            Ok(json!({"question_1": "Yes", "question_1_reasoning": "Sure"}).to_string())
        }
    }

    fn population(names: &[&str]) -> Vec<Persona> {
        names
            .iter()
            .map(|name| Persona::from_value(json!({"name": name})).unwrap())
            .collect()
    }

    fn numbered(count: usize) -> Vec<Persona> {
        let names: Vec<String> = (0..count).map(|i| format!("p{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        population(&refs)
    }

    fn survey() -> (Vec<Question>, SurveySchema) {
        let questions = parse_questions("Would you buy it?\n(Yes / No)").unwrap();
        let schema = build_schema(&questions).unwrap();
        (questions, schema)
    }

    fn run<'a>(
        participants: &'a [Persona],
        questions: &'a [Question],
        schema: &'a SurveySchema,
        batch_count: usize,
    ) -> SurveyRun<'a> {
        SurveyRun {
            participants,
            questions,
            schema,
            model: "test-model",
            temperature: 0.7,
            batch_count,
        }
    }

    #[test]
    fn plan_uses_ceiling_batches() {
        let plan = BatchPlan::new(10, 3);
        assert_eq!(plan.per_batch, 4);
        assert_eq!(plan.ranges, vec![0..4, 4..8, 8..10]);
        assert_eq!(plan.participant_id(2, 1), 10);
    }

    #[test]
    fn plan_omits_trailing_empty_batches_and_clamps() {
        // ceil(5 / 4) = 2 leaves only three non-empty batches
        assert_eq!(BatchPlan::new(5, 4).ranges, vec![0..2, 2..4, 4..5]);
        assert_eq!(BatchPlan::new(3, 0).ranges, vec![0..3]);
        assert_eq!(BatchPlan::new(2, 9).ranges, vec![0..1, 1..2]);
        assert!(BatchPlan::new(0, 4).ranges.is_empty());
    }

    #[tokio::test]
    async fn ids_cover_every_participant_in_order() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::ZERO,
        });
        let participants = numbered(10);
        let (questions, schema) = survey();

        let report = BatchScheduler::new(&client)
            .run(run(&participants, &questions, &schema, 3), &NoProgress)
            .await;

        let ids: Vec<u32> = report.results.iter().map(|r| r.participant_id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u32>>());
        assert_eq!(report.results[4].persona, participants[4]);
        assert!(report.is_complete());
        assert_eq!(report.attempted, 10);
    }

    #[tokio::test]
    async fn results_are_ordered_by_id_whatever_order_batches_finish_in() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::from_millis(50),
        });
        // Batch 0 holds the slow personas and finishes last.
        let participants = population(&["slow-a", "slow-b", "c", "d", "e", "f"]);
        let (questions, schema) = survey();
        let finished = Mutex::new(Vec::new());
        let sink = |update: ProgressUpdate| {
            if let ProgressUpdate::BatchCompleted { batch_index, .. } = update {
                finished.lock().unwrap().push(batch_index);
            }
        };

        let started = Instant::now();
        let report = BatchScheduler::new(&client)
            .run(run(&participants, &questions, &schema, 3), &sink)
            .await;
        let elapsed = started.elapsed();

        let finished = finished.into_inner().unwrap();
        assert_eq!(finished.len(), 3);
        assert_eq!(finished.last(), Some(&0));
        let ids: Vec<u32> = report.results.iter().map(|r| r.participant_id).collect();
        assert_eq!(ids, (1..=6).collect::<Vec<u32>>());
        assert_eq!(report.results[0].persona, participants[0]);

        // Run one after another the batches would take 600ms; concurrently
        // the slow batch alone bounds the run at about 400ms.
        assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn undeclared_answer_fields_are_not_recorded() {
        struct ChattyModel;

        #[async_trait]
        impl ChatModel for ChattyModel {
            async fn call(&self, _request: ChatRequest) -> Result<String, ModelCallError> {
                Ok(json!({
                    "participant_id": 99,
                    "question_1": "Yes",
                    "question_1_reasoning": "Sure",
                    "notes": {"mood": "good"}
                })
                .to_string())
            }
        }

        let client = AnswerClient::new(ChattyModel);
        let participants = numbered(2);
        let (questions, schema) = survey();

        let report = BatchScheduler::new(&client)
            .run(run(&participants, &questions, &schema, 1), &NoProgress)
            .await;

        let first = &report.results[0];
        assert_eq!(first.participant_id, 1);
        let keys: Vec<&str> = first.answers.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["question_1", "question_1_reasoning"]);
        assert_eq!(first.to_record()["participant_id"], json!(1));
    }

    #[tokio::test]
    async fn zero_heartbeat_disables_still_working_updates() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::from_millis(20),
        });
        let participants = numbered(4);
        let (questions, schema) = survey();
        let updates = Mutex::new(Vec::new());
        let sink = |update: ProgressUpdate| updates.lock().unwrap().push(update);

        let report = BatchScheduler::new(&client)
            .with_heartbeat(Duration::ZERO)
            .run(run(&participants, &questions, &schema, 2), &sink)
            .await;

        let updates = updates.into_inner().unwrap();
        assert_eq!(updates.len(), 2);
        assert!(
            updates
                .iter()
                .all(|update| matches!(update, ProgressUpdate::BatchCompleted { .. }))
        );
        assert_eq!(report.produced(), 4);
    }

    #[tokio::test]
    async fn transport_failure_drops_only_its_batch() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::ZERO,
        });
        let participants = population(&["a", "b", "c", "offline", "e", "f"]);
        let (questions, schema) = survey();

        let report = BatchScheduler::new(&client)
            .run(run(&participants, &questions, &schema, 3), &NoProgress)
            .await;

        // Batch 1 holds participants 3 and 4; 3 answered before 4 failed.
        let ids: Vec<u32> = report.results.iter().map(|r| r.participant_id).collect();
        assert_eq!(ids, vec![1, 2, 5, 6]);
        assert_eq!(report.failed_batches.len(), 1);
        assert_eq!(report.failed_batches[0].batch_index, 1);
        assert_eq!(report.requested, 6);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn decode_failure_skips_one_participant() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::ZERO,
        });
        let participants = population(&["a", "garbled", "c"]);
        let (questions, schema) = survey();

        let report = BatchScheduler::new(&client)
            .run(run(&participants, &questions, &schema, 1), &NoProgress)
            .await;

        let ids: Vec<u32> = report.results.iter().map(|r| r.participant_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(report.decode_failures, 1);
        assert!(report.failed_batches.is_empty());
    }

    #[tokio::test]
    async fn progress_never_runs_ahead_of_results() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::from_millis(30),
        });
        let participants = numbered(6);
        let (questions, schema) = survey();
        let updates = Mutex::new(Vec::new());
        let sink = |update: ProgressUpdate| updates.lock().unwrap().push(update);

        let report = BatchScheduler::new(&client)
            .with_heartbeat(Duration::from_millis(10))
            .run(run(&participants, &questions, &schema, 2), &sink)
            .await;

        let updates = updates.into_inner().unwrap();
        let mut resolved = 0;
        let mut heartbeats = 0;
        for update in &updates {
            assert_eq!(update.total(), 6);
            match update {
                ProgressUpdate::BatchCompleted {
                    batch_results,
                    completed,
                    ..
                } => {
                    resolved += batch_results;
                    assert_eq!(*completed, resolved);
                }
                ProgressUpdate::StillWorking { completed, .. } => {
                    heartbeats += 1;
                    assert!(*completed <= resolved);
                }
            }
        }
        assert!(heartbeats > 0);
        assert_eq!(resolved, report.produced());
        assert_eq!(report.produced(), 6);
    }

    #[tokio::test]
    async fn empty_population_is_an_empty_report() {
        let client = AnswerClient::new(NameDrivenModel {
            delay: Duration::ZERO,
        });
        let (questions, schema) = survey();
        let report = BatchScheduler::new(&client)
            .run(run(&[], &questions, &schema, 4), &NoProgress)
            .await;
        assert_eq!(report, RunReport::empty());
    }
}
