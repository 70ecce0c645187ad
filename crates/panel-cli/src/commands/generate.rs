use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use panel_application::{SurveySession, SurveyUseCase};
use panel_core::config::Settings;
use panel_core::persona::PersonaRepository;
use panel_infrastructure::FilePersonaRepository;
use panel_interaction::GenerationRequest;

use super::utils::{build_agent, load_settings, read_text};

pub struct GenerateArgs {
    pub segment: String,
    pub fields: Option<String>,
    pub fields_file: Option<PathBuf>,
    pub count: usize,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub output: PathBuf,
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    let Settings {
        generation: settings,
        client,
        ..
    } = load_settings()?;
    let fields = read_text(args.fields.as_deref(), args.fields_file.as_deref(), "fields").await?;
    let agent = build_agent(&client)?;

    let request = GenerationRequest {
        segment: args.segment,
        fields,
        count: args.count,
        model: args
            .model
            .or(settings.model)
            .unwrap_or_else(|| agent.default_model().to_string()),
        temperature: args.temperature.unwrap_or(settings.temperature),
    };

    let use_case = SurveyUseCase::new(agent).with_generation_chunk_size(settings.chunk_size);
    let mut session = SurveySession::new();
    let generated = use_case.generate_personas(&mut session, &request).await?;

    FilePersonaRepository::new(&args.output)
        .save_all(session.personas())
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "{}",
        format!(
            "Generated {generated} of {} personas -> {}",
            request.count,
            args.output.display()
        )
        .green()
    );
    Ok(())
}
