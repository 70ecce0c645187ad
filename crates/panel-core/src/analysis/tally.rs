//! Per-question response counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::survey::{Question, SurveyResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
}

/// Response counts for one question, in declared option order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub question_index: usize,
    pub question: String,
    pub counts: Vec<OptionCount>,
    /// Answers outside the declared options, including missing answers.
    pub unmatched: usize,
}

impl Tally {
    /// Count for an option; 0 for options the question does not declare.
    pub fn get(&self, option: &str) -> usize {
        self.counts
            .iter()
            .find(|entry| entry.option == option)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Sum of counts over the declared options.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|entry| entry.count).sum()
    }

    /// Percentage of declared-option answers that chose `option`.
    pub fn share(&self, option: &str) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.get(option) as f64 * 100.0 / total as f64
    }

    /// `(option, count)` pairs in declared order, ready for a bar series.
    pub fn series(&self) -> Vec<(&str, usize)> {
        self.counts
            .iter()
            .map(|entry| (entry.option.as_str(), entry.count))
            .collect()
    }
}

/// Counts the answers to one question across `results`.
///
/// Always a full recompute from the given rows.
pub fn tally<'a, I>(results: I, question_index: usize, question: &Question) -> Tally
where
    I: IntoIterator<Item = &'a SurveyResult>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    for result in results {
        let answer = result.answer(question_index).unwrap_or_default();
        *seen.entry(answer).or_insert(0) += 1;
    }

    let counts: Vec<OptionCount> = question
        .options
        .iter()
        .map(|option| OptionCount {
            option: option.clone(),
            count: seen.get(option).copied().unwrap_or(0),
        })
        .collect();

    let unmatched = seen
        .iter()
        .filter(|(answer, _)| !question.options.contains(answer))
        .map(|(_, count)| count)
        .sum();

    Tally {
        question_index,
        question: question.text.clone(),
        counts,
        unmatched,
    }
}
