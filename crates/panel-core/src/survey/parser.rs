//! Free-text question parsing.
//!
//! Questions are written one per line. A question may be followed by an
//! options line wrapped entirely in parentheses with `/` separated choices:
//!
//! ```text
//! How satisfied are you?
//! (Very / Somewhat / Not at all)
//! How likely are you to recommend us (1-5 scale)
//! ```
//!
//! A parenthesized line that contains `e.g.` is an example clause, not an
//! options line, and is parsed as a question of its own.

use once_cell::sync::Lazy;
use regex::Regex;

use super::question::Question;
use crate::error::{PanelError, Result};

static SPACE_BEFORE_QUESTION_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\?").expect("invalid question mark regex"));

static OPTIONS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((.*)\)$").expect("invalid options line regex"));

static SCALE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(?\s*(\d+)\s*[-–]\s*(\d+)\s+scale\s*\)?").expect("invalid scale regex")
});

/// Scales wider than this are treated as text, not as generated options.
const MAX_SCALE_POINTS: u32 = 100;

/// Parses raw multi-line question text into an ordered question list.
///
/// Fails with [`PanelError::Parse`] when the text contains no questions.
pub fn parse_questions(text: &str) -> Result<Vec<Question>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut questions = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let question_text = normalize_question(lines[i]);

        let options = match lines.get(i + 1).and_then(|next| options_line(next)) {
            Some(options) => {
                // The options line belongs to this question only.
                i += 1;
                Some(options)
            }
            None => None,
        };

        let question = match options {
            Some(options) => Question::new(question_text, options),
            None => scale_question(&question_text).unwrap_or_else(|| Question::open(question_text)),
        };
        tracing::debug!(
            question = %question.text,
            options = question.options.len(),
            "Parsed survey question"
        );
        questions.push(question);
        i += 1;
    }

    if questions.is_empty() {
        return Err(PanelError::parse("Please enter valid survey questions"));
    }
    Ok(questions)
}

fn normalize_question(line: &str) -> String {
    SPACE_BEFORE_QUESTION_MARK.replace_all(line, "?").into_owned()
}

/// Returns the options of a line that is wholly parenthesized and is not an
/// example clause.
fn options_line(line: &str) -> Option<Vec<String>> {
    if line.to_lowercase().contains("e.g.") {
        return None;
    }
    let inner = OPTIONS_LINE.captures(line)?.get(1)?.as_str();
    Some(
        inner
            .split('/')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Expands a numeric scale marker such as `(1-5 scale)` into options.
fn scale_question(text: &str) -> Option<Question> {
    let captures = SCALE_MARKER.captures(text)?;
    let min: u32 = captures.get(1)?.as_str().parse().ok()?;
    let max: u32 = captures.get(2)?.as_str().parse().ok()?;
    if max < min || max - min >= MAX_SCALE_POINTS {
        return None;
    }

    let stripped = SCALE_MARKER.replace(text, " ");
    let stripped = normalize_question(stripped.trim());
    let options = (min..=max).map(|point| point.to_string()).collect();
    Some(Question::new(stripped, options))
}
