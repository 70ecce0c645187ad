//! Persona domain module.
//!
//! # Module Structure
//!
//! - `model`: the `Persona` record and header discovery helpers
//! - `repository`: repository trait for persona persistence
//! - `sampler`: uniform participant selection without replacement
//!
//! # Usage
//!
//! ```ignore
//! use panel_core::persona::{Persona, PersonaRepository, select_indices};
//! ```

mod model;
mod repository;
pub mod sampler;

// Re-export public API
pub use model::{Persona, display_value, fields_of_first, uniform_fields};
pub use repository::PersonaRepository;
pub use sampler::{select_indices, select_indices_with};
