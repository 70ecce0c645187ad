//! Cross-tab filters over survey results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::survey::{PARTICIPANT_ID, SurveyResult, is_answer_field};

/// Fields with more distinct values than this are not offered as filters.
pub const MAX_FILTER_VALUES: usize = 15;

/// Identifier columns are never offered as filters.
const ID_FIELD: &str = "ID";

/// Accepted value per persona field. A missing entry means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    criteria: BTreeMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets the accepted value for a field. Any string, including `all`,
    /// is matched literally.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.criteria.insert(field.into(), value.into());
    }

    /// Drops the constraint on one field.
    pub fn clear_field(&mut self, field: &str) {
        self.criteria.remove(field);
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.criteria.iter()
    }

    /// Parses `field=value` pairs, e.g. from command-line arguments.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (field, value) = pair.split_once('=').ok_or_else(|| {
                PanelError::validation(format!("filter '{pair}' must look like field=value"))
            })?;
            let field = field.trim();
            if field.is_empty() {
                return Err(PanelError::validation(format!("filter '{pair}' has no field name")));
            }
            filters.set(field, value.trim());
        }
        Ok(filters)
    }

    /// True when every criterion equals the result's field, compared as strings.
    pub fn matches(&self, result: &SurveyResult) -> bool {
        self.criteria
            .iter()
            .all(|(field, value)| result.field_display(field).as_deref() == Some(value.as_str()))
    }
}

/// Returns the results that satisfy every criterion, in input order.
pub fn filter<'a>(results: &'a [SurveyResult], filters: &FilterSet) -> Vec<&'a SurveyResult> {
    results.iter().filter(|result| filters.matches(result)).collect()
}

/// Persona fields suitable for filter dropdowns.
///
/// Every non-answer field other than `participant_id` (and an `ID` column),
/// in first-record order, whose distinct-value count across the run is at
/// most [`MAX_FILTER_VALUES`].
pub fn candidate_filter_fields(results: &[SurveyResult]) -> Vec<String> {
    let Some(first) = results.first() else {
        return Vec::new();
    };

    first
        .to_record()
        .keys()
        .filter(|field| {
            field.as_str() != PARTICIPANT_ID && field.as_str() != ID_FIELD && !is_answer_field(field)
        })
        .filter(|field| distinct_values(results, field).len() <= MAX_FILTER_VALUES)
        .cloned()
        .collect()
}

/// Distinct values of a field across the results, sorted.
pub fn filter_values(results: &[SurveyResult], field: &str) -> Vec<String> {
    distinct_values(results, field).into_iter().collect()
}

fn distinct_values(results: &[SurveyResult], field: &str) -> BTreeSet<String> {
    results
        .iter()
        .map(|result| result.field_display(field).unwrap_or_default())
        .collect()
}
