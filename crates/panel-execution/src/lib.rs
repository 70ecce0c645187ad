//! Survey run execution: batch scheduling, progress and run events.

pub mod progress;
pub mod scheduler;
pub mod tracing_layer;

pub use progress::{BatchFailure, NoProgress, ProgressSink, ProgressUpdate, RunReport};
pub use scheduler::{BatchPlan, BatchScheduler, DEFAULT_HEARTBEAT, SurveyRun};
pub use tracing_layer::{RunEvent, RunEventLayer};
