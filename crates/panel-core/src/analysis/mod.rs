//! Result aggregation.
//!
//! Every call recomputes from the (filtered) result rows. Result sets are a
//! few hundred rows at most and filters change on every interaction, so no
//! partial sums are kept.

pub mod filter;
pub mod tally;

use serde::Serialize;

pub use filter::{FilterSet, MAX_FILTER_VALUES, candidate_filter_fields, filter, filter_values};
pub use tally::{OptionCount, Tally, tally};

use crate::error::{PanelError, Result};
use crate::survey::{Question, SurveyResult};

/// Filtered rows with one tally per question.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis<'a> {
    pub rows: Vec<&'a SurveyResult>,
    pub tallies: Vec<Tally>,
}

/// Applies `filters` and tallies every question over the matching rows.
///
/// Fails with [`PanelError::Aggregation`] when no row matches, which callers
/// present as an empty state.
pub fn analyze<'a>(
    results: &'a [SurveyResult],
    questions: &[Question],
    filters: &FilterSet,
) -> Result<Analysis<'a>> {
    let rows = filter(results, filters);
    if rows.is_empty() {
        return Err(PanelError::aggregation("No results match the selected filters"));
    }

    let tallies = questions
        .iter()
        .enumerate()
        .map(|(index, question)| tally(rows.iter().copied(), index, question))
        .collect();

    Ok(Analysis { rows, tallies })
}
