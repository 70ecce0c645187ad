//! Survey domain module.
//!
//! # Module Structure
//!
//! - `question`: the `Question` model and answer field naming
//! - `parser`: free-text question parsing
//! - `schema`: structured-output schema generation
//! - `result`: per-participant result records

pub mod parser;
mod question;
pub mod result;
pub mod schema;

pub use parser::parse_questions;
pub use question::{Question, is_answer_field, question_key, reasoning_key};
pub use result::{AnswerMap, PARTICIPANT_ID, SurveyResult, sort_by_participant};
pub use schema::{FieldKind, SCHEMA_NAME, SchemaField, SurveySchema, build_schema};
