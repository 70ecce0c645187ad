use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use panel_application::SurveySession;
use panel_infrastructure::DemoSnapshotRepository;

use super::utils::{parse_filters, print_analysis};

pub async fn run(path: &Path, filters: &[String]) -> Result<()> {
    let snapshot = DemoSnapshotRepository::new(path)
        .load()
        .await
        .with_context(|| format!("Failed to load demo snapshot {}", path.display()))?;
    let session = SurveySession::from_snapshot(snapshot)?;

    println!("{}", "=== Panel demo ===".bright_magenta().bold());
    if !session.segment().is_empty() {
        println!("Segment: {}", session.segment());
    }
    println!(
        "{} personas, {} questions, {} responses",
        session.personas().len(),
        session.questions().len(),
        session.results().len()
    );

    let options = session.filter_options();
    if !options.is_empty() {
        println!("{}", "Filters:".bold());
        for (field, values) in options {
            println!("  {field}: {}", values.join(", "));
        }
    }

    let filters = parse_filters(filters)?;
    match session.analyze(&filters) {
        Ok(analysis) => print_analysis(&analysis),
        Err(err) if err.is_aggregation() => println!("{}", err.to_string().yellow()),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
