use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use panel_core::analysis::{Analysis, FilterSet};
use panel_core::config::{ClientSettings, Settings};
use panel_infrastructure::ConfigStorage;
use panel_interaction::OpenAiCompatibleAgent;

use crate::QuestionsArgs;

const BAR_WIDTH: usize = 30;

/// Returns inline text or the contents of `file`.
pub async fn read_text(inline: Option<&str>, file: Option<&Path>, what: &str) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text.replace("\\n", "\n")),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {what} from {}", path.display())),
        (None, None) => anyhow::bail!("No {what} given"),
    }
}

pub async fn read_questions(args: &QuestionsArgs) -> Result<String> {
    read_text(
        args.questions.as_deref(),
        args.questions_file.as_deref(),
        "questions",
    )
    .await
}

/// Loads `~/.config/panel/config.toml`, falling back to defaults.
pub fn load_settings() -> Result<Settings> {
    match ConfigStorage::new() {
        Ok(storage) => storage
            .load()
            .with_context(|| format!("Failed to load {}", storage.path().display())),
        Err(err) => {
            tracing::debug!("Using default settings: {}", err);
            Ok(Settings::default())
        }
    }
}

pub fn build_agent(settings: &ClientSettings) -> Result<OpenAiCompatibleAgent> {
    Ok(OpenAiCompatibleAgent::try_from_env()
        .context("No model provider configured")?
        .with_client_settings(settings))
}

pub fn parse_filters(pairs: &[String]) -> Result<FilterSet> {
    Ok(FilterSet::from_pairs(pairs)?)
}

pub fn print_analysis(analysis: &Analysis<'_>) {
    println!(
        "{}",
        format!("{} matching responses", analysis.rows.len()).dimmed()
    );
    for tally in &analysis.tallies {
        println!();
        println!(
            "{}",
            format!("Q{}. {}", tally.question_index + 1, tally.question).bold()
        );
        let label_width = tally
            .counts
            .iter()
            .map(|count| count.option.chars().count())
            .max()
            .unwrap_or(0);
        for count in &tally.counts {
            let share = tally.share(&count.option);
            let bar = "█".repeat(((share / 100.0) * BAR_WIDTH as f64).round() as usize);
            println!(
                "  {:<width$}  {:>4}  {:>5.1}%  {}",
                count.option,
                count.count,
                share,
                bar.green(),
                width = label_width
            );
        }
        if tally.unmatched > 0 {
            println!(
                "  {}",
                format!("{} answers outside the listed options", tally.unmatched).yellow()
            );
        }
    }
}
