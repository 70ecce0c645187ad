//! Prompt templates for survey answering and persona generation.

use minijinja::{Environment, context};
use once_cell::sync::Lazy;
use panel_core::persona::Persona;
use panel_core::survey::{Question, SurveySchema};
use panel_core::{PanelError, Result};
use serde::Serialize;

const SURVEY_SYSTEM: &str = "\
You are taking part in a survey as the following person:
{{ persona }}

Answer every question the way this specific person would, based on their background, values and circumstances.
Do not pick the option that seems objectively best or most socially acceptable. Pick what this person would actually choose, even if it is unusual.
Keep each reasoning short and in the person's own voice.";

const SURVEY_USER: &str = "\
Please answer the following survey questions. Respond in JSON format according to the provided schema:

{{ schema }}

Questions:
{% for line in questions %}{{ loop.index }}. {{ line }}
{% endfor %}
Answer each question_N with exactly one of the listed choices, copied word for word, and explain the choice in question_N_reasoning.";

const GENERATION_SYSTEM: &str = "\
You create realistic synthetic people for market research panels. \
Every persona must be plausible on its own and the group must reflect the real spread within the segment. \
Respond with JSON only.";

const GENERATION_USER: &str = "\
Create {{ count }} distinct personas belonging to this segment:
{{ segment }}

Each persona has exactly these fields:
{% for field in fields %}- {{ field.name }}{% if field.hint %}: {{ field.hint }}{% endif %}
{% endfor %}
{%- if batches > 1 %}
This is batch {{ batch }} of {{ batches }}. Do not repeat people from earlier batches.
{%- endif %}
Respond with a JSON object of the form {\"personas\": [...]} holding exactly {{ count }} entries.";

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    for (name, source) in [
        ("survey_system", SURVEY_SYSTEM),
        ("survey_user", SURVEY_USER),
        ("generation_user", GENERATION_USER),
    ] {
        env.add_template(name, source)
            .expect("built-in prompt templates are valid");
    }
    env
});

fn render<S: Serialize>(name: &str, ctx: S) -> Result<String> {
    TEMPLATES
        .get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|err| PanelError::internal(format!("failed to render prompt '{name}': {err}")))
}

/// System message casting the model as one persona.
pub fn survey_system_prompt(persona: &Persona) -> Result<String> {
    render("survey_system", context! { persona => persona.describe() })
}

/// User message carrying the response schema and the numbered questions.
pub fn survey_user_prompt(questions: &[Question], schema: &SurveySchema) -> Result<String> {
    let schema_json = serde_json::to_string_pretty(&schema.to_json_schema())?;
    let lines: Vec<String> = questions.iter().map(Question::prompt_line).collect();
    render(
        "survey_user",
        context! { schema => schema_json, questions => lines },
    )
}

pub fn generation_system_prompt() -> &'static str {
    GENERATION_SYSTEM
}

/// One requested persona attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    /// Free-text guidance following the field name, if any
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationPrompt<'a> {
    pub segment: &'a str,
    pub fields: &'a [FieldSpec],
    pub count: usize,
    pub batch: usize,
    pub batches: usize,
}

pub fn generation_user_prompt(prompt: &GenerationPrompt<'_>) -> Result<String> {
    render("generation_user", prompt)
}
