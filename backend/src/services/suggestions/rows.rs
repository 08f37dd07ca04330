//! CSV parsing and per-row checks shared by the bulk validate and bulk create jobs.

use common::model::suggestion::RowIssue;
use common::requests::{BulkMapping, FieldKind};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Parsed upload: trimmed header titles and data rows numbered from 1.
#[derive(Debug, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Rows split by the outcome of their checks.
#[derive(Debug, Default)]
pub struct RowOutcome {
    /// `(row, field -> value)` for every row that passed.
    pub accepted: Vec<(usize, BTreeMap<String, String>)>,
    pub issues: Vec<RowIssue>,
}

/// Picks the most frequent of `, ; \t |` in the header line.
pub fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .into_iter()
        .map(|d| (d, header_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

pub fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

/// Header titles of the first line, split on the detected delimiter.
pub fn header_cells(header_line: &str) -> Vec<String> {
    let delimiter = char::from(detect_delimiter(header_line));
    header_line.split(delimiter).map(normalize_cell).collect()
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// First line of the upload, without BOM or line ending.
pub fn first_line(bytes: &[u8]) -> Result<String, String> {
    let text = std::str::from_utf8(bytes).map_err(|_| "CSV is not valid UTF-8".to_string())?;
    let line = strip_bom(text).lines().next().unwrap_or_default();
    Ok(line.trim_end_matches('\r').to_string())
}

pub fn read_table(bytes: &[u8]) -> Result<Table, String> {
    let text = std::str::from_utf8(bytes).map_err(|_| "CSV is not valid UTF-8".to_string())?;
    let text = strip_bom(text);
    let delimiter = detect_delimiter(text.lines().next().unwrap_or_default());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("Malformed CSV header: {}", e))?
        .iter()
        .map(normalize_cell)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Malformed CSV: {}", e))?;
        rows.push((i + 1, record.iter().map(normalize_cell).collect()));
    }
    Ok(Table { headers, rows })
}

/// Maps every mapped title to its column index.
pub fn column_index(
    headers: &[String],
    mapping: &BulkMapping,
) -> Result<HashMap<String, usize>, String> {
    if mapping.is_empty() {
        return Err("Mapping has no columns".to_string());
    }
    mapping
        .columns
        .keys()
        .map(|title| {
            headers
                .iter()
                .position(|h| h == title)
                .map(|idx| (title.clone(), idx))
                .ok_or_else(|| format!("Column '{}' not found in CSV header", title))
        })
        .collect()
}

pub fn validate_value(kind: FieldKind, value: &str) -> Result<(), String> {
    let in_range = |min: f64, max: f64| match value.parse::<f64>() {
        Ok(n) if n.is_finite() && (min..=max).contains(&n) => Ok(()),
        _ => Err(format!("'{}' is not a number between {} and {}", value, min, max)),
    };
    match kind {
        FieldKind::Text => Ok(()),
        FieldKind::Number => match value.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(()),
            _ => Err(format!("'{}' is not a number", value)),
        },
        FieldKind::Latitude => in_range(-90.0, 90.0),
        FieldKind::Longitude => in_range(-180.0, 180.0),
        FieldKind::Url => {
            let has_scheme = value.starts_with("http://") || value.starts_with("https://");
            if has_scheme && !value.chars().any(char::is_whitespace) {
                Ok(())
            } else {
                Err(format!("'{}' is not an http(s) URL", value))
            }
        }
    }
}

/// Checks one row; the first failing column rejects the whole row.
fn check_row(
    row: usize,
    cells: &[String],
    mapping: &BulkMapping,
    index: &HashMap<String, usize>,
) -> Result<BTreeMap<String, String>, RowIssue> {
    let mut fields = BTreeMap::new();
    for (title, column) in &mapping.columns {
        let value = index
            .get(title)
            .and_then(|&idx| cells.get(idx))
            .map(String::as_str)
            .unwrap_or_default();
        let issue = |message: String| RowIssue {
            row,
            column: title.clone(),
            message,
        };

        if value.is_empty() {
            if column.required {
                return Err(issue("required value is missing".to_string()));
            }
            continue;
        }
        validate_value(column.kind, value).map_err(issue)?;
        fields.insert(column.field.clone(), value.to_string());
    }
    Ok(fields)
}

/// Checks every row in batches of `chunk_size`, calling `on_chunk(done, total)`
/// after each batch. Row order is kept in both outputs.
pub fn check_rows(
    table: &Table,
    mapping: &BulkMapping,
    chunk_size: usize,
    mut on_chunk: impl FnMut(usize, usize),
) -> Result<RowOutcome, String> {
    let index = column_index(&table.headers, mapping)?;
    let total = table.rows.len();
    let mut outcome = RowOutcome::default();
    let mut done = 0;

    for chunk in table.rows.chunks(chunk_size.max(1)) {
        let checked: Vec<_> = chunk
            .par_iter()
            .map(|(row, cells)| check_row(*row, cells, mapping, &index).map(|f| (*row, f)))
            .collect();
        for result in checked {
            match result {
                Ok(accepted) => outcome.accepted.push(accepted),
                Err(issue) => outcome.issues.push(issue),
            }
        }
        done += chunk.len();
        on_chunk(done, total);
    }
    Ok(outcome)
}
