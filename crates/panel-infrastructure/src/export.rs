//! CSV and JSON export of personas and survey results.
//!
//! The CSV header is the key list of the first record. A value containing a
//! comma, quote or line break is wrapped in quotes with inner quotes doubled.
//! Rows are separated by `\n`.

use panel_core::persona::{Persona, display_value};
use panel_core::survey::SurveyResult;
use panel_core::{PanelError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// A flat export record.
pub type Record = Map<String, Value>;

pub fn persona_records(personas: &[Persona]) -> Vec<Record> {
    personas.iter().map(|persona| persona.as_map().clone()).collect()
}

pub fn result_records(results: &[SurveyResult]) -> Vec<Record> {
    results.iter().map(SurveyResult::to_record).collect()
}

/// Renders records as CSV. Fails when there is nothing to export.
pub fn to_csv(records: &[Record]) -> Result<String> {
    let first = records
        .first()
        .ok_or_else(|| PanelError::validation("No data to download"))?;
    let fields: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        fields
            .iter()
            .map(|field| escape_cell(field))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        let row = fields
            .iter()
            .map(|field| escape_cell(&record.get(*field).map(display_value).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }
    Ok(lines.join("\n"))
}

/// Renders any serializable collection as pretty JSON.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn escape_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parses CSV text into records whose values are all strings.
///
/// Accepts quoted cells with doubled quotes and embedded line breaks, and
/// both `\n` and `\r\n` row endings. Short rows are padded with empty
/// strings; rows longer than the header are an error.
pub fn parse_csv(text: &str) -> Result<Vec<Record>> {
    let rows = split_rows(text)?;
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for (line, row) in rows.enumerate() {
        if row.len() == 1 && row[0].is_empty() {
            continue;
        }
        if row.len() > header.len() {
            return Err(PanelError::serialization(
                "CSV",
                format!(
                    "row {} has {} cells but the header has {}",
                    line + 2,
                    row.len(),
                    header.len()
                ),
            ));
        }
        let mut record = Map::new();
        for (index, field) in header.iter().enumerate() {
            let cell = row.get(index).cloned().unwrap_or_default();
            record.insert(field.clone(), Value::String(cell));
        }
        records.push(record);
    }
    Ok(records)
}

fn split_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                other => cell.push(other),
            }
            continue;
        }
        match c {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            other => cell.push(other),
        }
    }

    if in_quotes {
        return Err(PanelError::serialization("CSV", "unterminated quoted cell"));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    Ok(rows)
}
