use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use panel_application::{RunOptions, SurveySession, SurveyUseCase};
use panel_core::analysis::FilterSet;
use panel_execution::ProgressUpdate;
use panel_infrastructure::{DemoSnapshotRepository, FilePersonaRepository, save_results};

use super::utils::{build_agent, load_settings, print_analysis, read_questions};
use crate::QuestionsArgs;

pub struct SurveyArgs {
    pub personas: PathBuf,
    pub questions: QuestionsArgs,
    pub participants: Option<usize>,
    pub batches: Option<usize>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub output: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

pub async fn run(args: SurveyArgs) -> Result<()> {
    let settings = load_settings()?;
    let questions = read_questions(&args.questions).await?;

    let mut session = SurveySession::new();
    session.set_questions(&questions)?;

    let agent = build_agent(&settings.client)?;
    let mut options = RunOptions::from_settings(&settings.survey, agent.default_model());
    if let Some(participants) = args.participants {
        options.participants = participants;
    }
    if let Some(batches) = args.batches {
        options.batch_count = batches;
    }
    if let Some(model) = args.model {
        options.model = model;
    }
    if let Some(temperature) = args.temperature {
        options.temperature = temperature;
    }

    let use_case = SurveyUseCase::new(agent);
    let loaded = use_case
        .load_personas(&mut session, &FilePersonaRepository::new(&args.personas))
        .await
        .with_context(|| format!("Failed to load personas from {}", args.personas.display()))?;
    eprintln!("Loaded {loaded} personas");

    let report = use_case
        .run_survey(&mut session, &options, &print_progress)
        .await?;

    if !report.is_complete() {
        eprintln!(
            "{}",
            format!(
                "{} of {} participants answered ({} undecodable, {} failed batches)",
                report.produced(),
                report.requested,
                report.decode_failures,
                report.failed_batches.len()
            )
            .yellow()
        );
    }

    if let Some(output) = &args.output {
        save_results(output, session.results())
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!("Results saved to {}", output.display());
    }
    if let Some(path) = &args.snapshot {
        DemoSnapshotRepository::new(path)
            .save(&session.to_snapshot())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Snapshot saved to {}", path.display());
    }

    match session.analyze(&FilterSet::new()) {
        Ok(analysis) => print_analysis(&analysis),
        Err(err) if err.is_aggregation() => println!("{}", "No results to show".yellow()),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn print_progress(update: ProgressUpdate) {
    match update {
        ProgressUpdate::BatchCompleted {
            batch_index,
            completed,
            total,
            ..
        } => eprintln!("[{completed}/{total}] batch {} finished", batch_index + 1),
        ProgressUpdate::StillWorking {
            completed,
            total,
            elapsed,
        } => eprintln!(
            "{}",
            format!("[{completed}/{total}] still working ({}s)", elapsed.as_secs()).dimmed()
        ),
    }
}
