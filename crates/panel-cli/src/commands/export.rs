use std::path::Path;

use anyhow::{Context, Result};
use panel_core::persona::PersonaRepository;
use panel_infrastructure::{FilePersonaRepository, load_results, save_results};

pub async fn run(input: &Path, output: &Path, personas: bool) -> Result<()> {
    let count = if personas {
        let personas = FilePersonaRepository::new(input)
            .get_all()
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;
        FilePersonaRepository::new(output).save_all(&personas).await?;
        personas.len()
    } else {
        let results = load_results(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?;
        save_results(output, &results).await?;
        results.len()
    };
    println!("Exported {count} records to {}", output.display());
    Ok(())
}
