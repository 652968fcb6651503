// src/sheet_transform.rs
use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::data_types::{Query, RawRecord, ResultPage, TransformedRecord};
use crate::excel_date;

pub const COMPLETION_TIME: &str = "Completion time";
pub const NAME_COLUMN: &str = "Name";
pub const EQUIPMENT_COLUMN: &str = "Equipment";

// Bookkeeping columns the form writes on every submission
const SUPPRESSED_COLUMNS: [&str; 4] = ["Id", "Start time", "Email", "Name"];

static HEADER_RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (COMPLETION_TIME, "Submitted Time"),
        ("Name1", NAME_COLUMN),
    ])
});

/// The whole used range after header remapping, newest submission first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub records: Vec<TransformedRecord>,
}

/// Text of a cell as it is shown in the table.
pub fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

pub fn display_header(header: &str) -> Option<&str> {
    if SUPPRESSED_COLUMNS.contains(&header) {
        return None;
    }
    Some(HEADER_RENAMES.get(header).copied().unwrap_or(header))
}

/// Row 0 is the header row, the rest are submissions in the order they were appended.
pub fn transform(values: &[RawRecord]) -> Sheet {
    let Some((header_row, rows)) = values.split_first() else {
        return Sheet::default();
    };

    let raw_headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect();

    // (raw column index, display name) for every retained column
    let mut retained = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for (i, raw) in raw_headers.iter().enumerate() {
        let Some(display) = display_header(raw) else {
            continue;
        };
        if !columns.iter().any(|c| c == display) {
            columns.push(display.to_string());
        }
        retained.push((i, raw.as_str(), display));
    }

    let mut records: Vec<TransformedRecord> = rows
        .iter()
        .map(|row| {
            let mut record = TransformedRecord::new();
            for &(i, raw, display) in &retained {
                let value = if raw == COMPLETION_TIME {
                    Some(excel_date::decode_cell(row.get(i).unwrap_or(&Value::Null)))
                } else {
                    row.get(i).and_then(cell_text)
                };
                if let Some(value) = value {
                    record.insert(display, value);
                }
            }
            record
        })
        .collect();

    records.reverse();

    Sheet { columns, records }
}

/// Case-insensitive substring match. An empty needle matches everything.
pub fn matches_filter(record: &TransformedRecord, column: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record
        .get(column)
        .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
}

pub fn apply_filters(records: Vec<TransformedRecord>, query: &Query) -> Vec<TransformedRecord> {
    records
        .into_iter()
        .filter(|record| matches_filter(record, NAME_COLUMN, &query.name_filter))
        .filter(|record| matches_filter(record, EQUIPMENT_COLUMN, &query.equipment_filter))
        .collect()
}

/// Slice for a 1-based page; pages past the end are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let start = page.max(1).saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

impl Sheet {
    pub fn into_page(self, query: &Query) -> ResultPage {
        let matching = apply_filters(self.records, query);
        let records = paginate(&matching, query.page(), query.page_size()).to_vec();

        ResultPage {
            records,
            total_matching: matching.len(),
            columns: self.columns,
            matching,
        }
    }
}
