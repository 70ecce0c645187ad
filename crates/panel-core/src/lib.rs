//! Core domain of the Panel survey pipeline.
//!
//! Leaf-first: personas and sampling, question parsing and response schema,
//! survey results, and aggregation. Nothing in this crate performs IO or
//! talks to a model.

pub mod analysis;
pub mod config;
pub mod demo;
pub mod error;
pub mod persona;
pub mod survey;

// Re-export common error type
pub use error::{PanelError, Result};
