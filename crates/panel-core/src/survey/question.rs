//! Survey question model.

use serde::{Deserialize, Serialize};

/// A survey question with its ordered option set.
///
/// Option order is meaningful: it defines the enumerated domain order in the
/// response schema and the bar order of tallies. An empty option list marks
/// an open-ended question, which cannot be put into a response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    pub fn new(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: text.into(),
            options,
        }
    }

    pub fn open(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_open_ended(&self) -> bool {
        self.options.is_empty()
    }

    /// Renders the question for a prompt, e.g. `Q? (Choose one: A, B)`.
    pub fn prompt_line(&self) -> String {
        format!("{} (Choose one: {})", self.text, self.options.join(", "))
    }
}

/// Name of the enumerated answer field for a 0-based question index.
pub fn question_key(index: usize) -> String {
    format!("question_{}", index + 1)
}

/// Name of the free-text reasoning field for a 0-based question index.
pub fn reasoning_key(index: usize) -> String {
    format!("question_{}_reasoning", index + 1)
}

/// Returns true for any answer or reasoning field name.
pub fn is_answer_field(name: &str) -> bool {
    name.starts_with("question_")
}
