//! Model-facing side of the survey pipeline.
//!
//! [`ChatModel`] is the single seam to the language model. Everything else
//! in this crate builds prompts for it and decodes what comes back.

pub mod answer_client;
pub mod chat;
pub mod config;
pub mod openai_compatible_agent;
pub mod persona_generator;
pub mod prompts;

pub use answer_client::{AnswerClient, AnswerError, decode_object};
pub use chat::{ChatMessage, ChatModel, ChatRequest, ModelCallError, ResponseFormat, Role};
pub use config::{Provider, ResolvedProvider, load_provider, resolve_provider};
pub use openai_compatible_agent::OpenAiCompatibleAgent;
pub use persona_generator::{GenerationRequest, PersonaGenerator, parse_field_specs};
