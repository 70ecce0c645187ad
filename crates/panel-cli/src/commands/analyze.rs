use std::path::PathBuf;

use anyhow::{Context, Result};
use panel_application::SurveySession;
use panel_infrastructure::{DemoSnapshotRepository, load_results};

use super::utils::{parse_filters, print_analysis, read_questions};
use crate::QuestionsArgs;

pub async fn run(
    results: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    questions: &QuestionsArgs,
    filters: &[String],
    json: bool,
) -> Result<()> {
    let mut session = match &snapshot {
        Some(path) => {
            let snapshot = DemoSnapshotRepository::new(path)
                .load()
                .await
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            SurveySession::from_snapshot(snapshot)?
        }
        None => SurveySession::new(),
    };

    if questions.questions.is_some() || questions.questions_file.is_some() {
        session.set_questions(&read_questions(questions).await?)?;
    }
    if let Some(path) = &results {
        let loaded = load_results(path)
            .await
            .with_context(|| format!("Failed to load results from {}", path.display()))?;
        session.record_results(loaded);
    }

    let filters = parse_filters(filters)?;
    let analysis = session.analyze(&filters)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis.tallies)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}
