//! Progress reporting and the outcome of a survey run.

use std::time::Duration;

use panel_core::PanelError;
use panel_core::survey::SurveyResult;
use serde::Serialize;

/// Progress signal emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// A batch finished; `completed` counts successful participants so far.
    BatchCompleted {
        batch_index: usize,
        batch_results: usize,
        completed: usize,
        total: usize,
    },
    /// Emitted on the heartbeat interval while batches are outstanding.
    /// Never advances `completed`.
    StillWorking {
        completed: usize,
        total: usize,
        elapsed: Duration,
    },
}

impl ProgressUpdate {
    pub fn completed(&self) -> usize {
        match self {
            Self::BatchCompleted { completed, .. } | Self::StillWorking { completed, .. } => {
                *completed
            }
        }
    }

    pub fn total(&self) -> usize {
        match self {
            Self::BatchCompleted { total, .. } | Self::StillWorking { total, .. } => *total,
        }
    }
}

/// Receives progress updates from the scheduler.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

/// A batch that was aborted by a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    /// Participants assigned to the batch, none of which produced a result
    pub participants: usize,
    pub message: String,
}

impl From<&BatchFailure> for PanelError {
    fn from(failure: &BatchFailure) -> Self {
        PanelError::Batch {
            batch_index: failure.batch_index,
            message: failure.message.clone(),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Successful results sorted by participant id
    pub results: Vec<SurveyResult>,
    /// Participants handed to the scheduler
    pub requested: usize,
    /// Model calls actually made
    pub attempted: usize,
    /// Participants skipped because their reply could not be decoded
    pub decode_failures: usize,
    pub failed_batches: Vec<BatchFailure>,
}

impl RunReport {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            requested: 0,
            attempted: 0,
            decode_failures: 0,
            failed_batches: Vec::new(),
        }
    }

    pub fn produced(&self) -> usize {
        self.results.len()
    }

    /// True when every requested participant produced a result.
    pub fn is_complete(&self) -> bool {
        self.produced() == self.requested
    }
}
