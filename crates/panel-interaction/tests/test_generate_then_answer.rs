use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use panel_core::persona::uniform_fields;
use panel_core::survey::{build_schema, parse_questions};
use panel_interaction::{
    AnswerClient, ChatModel, ChatRequest, GenerationRequest, ModelCallError, PersonaGenerator,
    ResponseFormat,
};
use serde_json::json;

/// Answers generation requests with personas and survey requests with a
/// fixed choice, depending on the schema it is given.
struct PanelStub {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for PanelStub {
    async fn call(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(ResponseFormat::JsonSchema { json_schema }) = request.response_format else {
            return Err(ModelCallError::InvalidResponse("no schema".into()));
        };
        if json_schema.name == "survey_response" {
            return Ok(json!({
                "question_1": "Weekly",
                "question_1_reasoning": "Habit"
            })
            .to_string());
        }
        Ok(format!(
            "Here you go:\n{}",
            json!({"personas": [
                {"name": format!("P{call}-a"), "age": 40 + call, "region": "North"},
                {"name": format!("P{call}-b"), "age": 50 + call, "region": "South"}
            ]})
        ))
    }
}

#[tokio::test]
async fn generated_population_can_answer_a_survey() {
    let generator = PersonaGenerator::new(PanelStub {
        calls: AtomicUsize::new(0),
    })
    .with_chunk_size(2);
    let personas = generator
        .generate(&GenerationRequest {
            segment: "Suburban parents".into(),
            fields: "name\nage: 30 to 60\nregion (North or South)".into(),
            count: 4,
            model: "openai/gpt-4o-mini".into(),
            temperature: 0.9,
        })
        .await
        .expect("generation should succeed");

    assert_eq!(personas.len(), 4);
    assert_eq!(uniform_fields(&personas).unwrap(), ["name", "age", "region"]);

    let questions = parse_questions("How often do you shop?\n(Daily / Weekly / Monthly)").unwrap();
    let schema = build_schema(&questions).unwrap();
    let client = AnswerClient::new(PanelStub {
        calls: AtomicUsize::new(0),
    });

    for persona in &personas {
        let answers = client
            .answer(persona, &questions, &schema, "openai/gpt-4o-mini", 0.7)
            .await
            .expect("answer should decode");
        assert!(schema.check_answers(&answers).is_empty());
    }
}
