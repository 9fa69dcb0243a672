//! Tabular rows and header-keyed records.

use serde_json::{Map, Value};

/// One row of cell values, in column order.
pub type TabularRow = Vec<String>;

/// One data row keyed by its header names, in header order.
pub type TabRecord = Map<String, Value>;

/// Re-key a tab's raw value range by its header row.
///
/// The first row is the header. Every following row becomes one record;
/// cells missing from a short row become empty strings and cells beyond the
/// header width are dropped. When a header name repeats, the rightmost
/// column's value is kept at the first column's position. An empty range
/// (no header) yields no records.
pub fn rows_to_records(values: Vec<TabularRow>) -> Vec<TabRecord> {
    let mut rows = values.into_iter();
    let Some(headers) = rows.next() else {
        return Vec::new();
    };

    rows.map(|row| {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = row.get(i).cloned().unwrap_or_default();
                (header.clone(), Value::String(cell))
            })
            .collect()
    })
    .collect()
}
