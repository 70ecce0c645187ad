//! Persona repository trait.
//!
//! Defines the interface for loading and storing a persona population.

use super::model::Persona;
use crate::error::Result;

/// An abstract repository for a persona population.
///
/// Decouples the pipeline from where personas come from (JSON file, CSV
/// export, demo snapshot). Implementations return personas in stored order.
#[async_trait::async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Retrieves all personas from storage.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Persona>)`: All stored personas, empty if nothing is stored
    /// - `Err(PanelError)`: Error if retrieval or validation fails
    async fn get_all(&self) -> Result<Vec<Persona>>;

    /// Saves all personas to storage, replacing existing ones.
    async fn save_all(&self, personas: &[Persona]) -> Result<()>;
}
