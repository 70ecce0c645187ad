use anyhow::Result;
use panel_core::survey::{build_schema, parse_questions};

use super::utils::read_questions;
use crate::QuestionsArgs;

pub async fn run(args: &QuestionsArgs) -> Result<()> {
    let text = read_questions(args).await?;
    let questions = parse_questions(&text)?;
    let schema = build_schema(&questions)?;
    println!("{}", serde_json::to_string_pretty(&schema.to_json_schema())?);
    Ok(())
}
