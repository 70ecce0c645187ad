//! File-backed persona, result and snapshot storage.
//!
//! The format follows the file extension: `.csv` files go through the CSV
//! exporter, everything else is JSON.

use std::path::{Path, PathBuf};

use panel_core::demo::DemoSnapshot;
use panel_core::persona::{Persona, PersonaRepository};
use panel_core::survey::SurveyResult;
use panel_core::{PanelError, Result};
use serde_json::Value;

use crate::export::{self, persona_records, result_records};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Csv,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Persona population stored in a single JSON array or CSV file.
pub struct FilePersonaRepository {
    path: PathBuf,
}

impl FilePersonaRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl PersonaRepository for FilePersonaRepository {
    async fn get_all(&self) -> Result<Vec<Persona>> {
        let Some(content) = read_optional(&self.path).await? else {
            return Ok(Vec::new());
        };

        let personas = match FileFormat::from_path(&self.path) {
            FileFormat::Csv => export::parse_csv(&content)?
                .into_iter()
                .map(Persona::from_map)
                .collect::<Result<Vec<_>>>()?,
            FileFormat::Json => {
                let value: Value = serde_json::from_str(&content)?;
                let items = match value {
                    Value::Array(items) => items,
                    // Accept `{"personas": [...]}` as produced by the generator.
                    Value::Object(mut map) => match map.remove("personas") {
                        Some(Value::Array(items)) => items,
                        _ => {
                            return Err(PanelError::validation(
                                "persona file must hold a JSON array or a 'personas' array",
                            ));
                        }
                    },
                    _ => {
                        return Err(PanelError::validation(
                            "persona file must hold a JSON array",
                        ));
                    }
                };
                items
                    .into_iter()
                    .map(Persona::from_value)
                    .collect::<Result<Vec<_>>>()?
            }
        };

        tracing::debug!("Loaded {} personas from {:?}", personas.len(), self.path);
        Ok(personas)
    }

    async fn save_all(&self, personas: &[Persona]) -> Result<()> {
        let content = match FileFormat::from_path(&self.path) {
            FileFormat::Csv => export::to_csv(&persona_records(personas))?,
            FileFormat::Json => export::to_json_pretty(personas)?,
        };
        write_creating_dirs(&self.path, content).await
    }
}

/// Loads survey results from a JSON or CSV export.
pub async fn load_results(path: &Path) -> Result<Vec<SurveyResult>> {
    let content = tokio::fs::read_to_string(path).await?;
    match FileFormat::from_path(path) {
        FileFormat::Csv => export::parse_csv(&content)?
            .into_iter()
            .map(SurveyResult::from_record)
            .collect(),
        FileFormat::Json => Ok(serde_json::from_str(&content)?),
    }
}

/// Saves survey results as JSON or CSV.
pub async fn save_results(path: &Path, results: &[SurveyResult]) -> Result<()> {
    let content = match FileFormat::from_path(path) {
        FileFormat::Csv => export::to_csv(&result_records(results))?,
        FileFormat::Json => export::to_json_pretty(results)?,
    };
    write_creating_dirs(path, content).await
}

/// Demo snapshot stored as one JSON file.
pub struct DemoSnapshotRepository {
    path: PathBuf,
}

impl DemoSnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<DemoSnapshot> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot: DemoSnapshot = serde_json::from_str(&content)?;
        tracing::info!(
            personas = snapshot.personas.len(),
            results = snapshot.survey_results.len(),
            "Loaded demo snapshot from {:?}",
            self.path
        );
        Ok(snapshot)
    }

    pub async fn save(&self, snapshot: &DemoSnapshot) -> Result<()> {
        write_creating_dirs(&self.path, export::to_json_pretty(snapshot)?).await
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn write_creating_dirs(path: &Path, content: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn personas() -> Vec<Persona> {
        vec![
            Persona::from_value(json!({"name": "Ana", "age": 30})).unwrap(),
            Persona::from_value(json!({"name": "Bo", "age": 41})).unwrap(),
        ]
    }

    #[tokio::test]
    async fn missing_persona_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FilePersonaRepository::new(temp_dir.path().join("none.json"));
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn json_personas_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FilePersonaRepository::new(temp_dir.path().join("out").join("personas.json"));
        repo.save_all(&personas()).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap(), personas());
    }

    #[tokio::test]
    async fn csv_personas_load_as_strings() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FilePersonaRepository::new(temp_dir.path().join("personas.csv"));
        repo.save_all(&personas()).await.unwrap();
        let loaded = repo.get_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].get("age"), Some(&json!("41")));
    }

    #[tokio::test]
    async fn generator_envelope_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("personas.json");
        tokio::fs::write(&path, r#"{"personas": [{"name": "Cy"}]}"#).await.unwrap();
        let loaded = FilePersonaRepository::new(path).get_all().await.unwrap();
        assert_eq!(loaded[0].get_display("name").as_deref(), Some("Cy"));
    }

    #[tokio::test]
    async fn results_round_trip_in_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        let answers = json!({"question_1": "Yes", "question_1_reasoning": "ok"});
        let results = vec![SurveyResult::new(
            1,
            personas().remove(0),
            answers.as_object().unwrap().clone(),
        )];

        let json_path = temp_dir.path().join("results.json");
        save_results(&json_path, &results).await.unwrap();
        assert_eq!(load_results(&json_path).await.unwrap(), results);

        let csv_path = temp_dir.path().join("results.csv");
        save_results(&csv_path, &results).await.unwrap();
        let loaded = load_results(&csv_path).await.unwrap();
        assert_eq!(loaded[0].participant_id, 1);
        assert_eq!(loaded[0].field_display("age").as_deref(), Some("30"));
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = DemoSnapshotRepository::new(temp_dir.path().join("demo.json"));
        let snapshot = DemoSnapshot {
            segment_description: "Students".into(),
            fields: "name\nage".into(),
            questions_text: "Study?\n(Yes / No)".into(),
            generated_code: None,
            personas: personas(),
            survey_results: Vec::new(),
        };
        repo.save(&snapshot).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), snapshot);
    }
}
