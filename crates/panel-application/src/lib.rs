//! Application layer for Panel.
//!
//! Use cases that coordinate the domain, the model-facing clients and the
//! batch scheduler around an explicit survey session.

pub mod survey_session;
pub mod survey_usecase;

pub use survey_session::SurveySession;
pub use survey_usecase::{RunOptions, SurveyUseCase};
