//! Tab-separated static data loader.
//!
//! The game ships its static tables (`experience.txt`, `itemstatcost.txt`, …)
//! as tab-separated text with a header row. Each data row becomes a
//! [`Record`] keyed by header name, plus an `_index` entry holding the row's
//! position among the data rows.

use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{MirrorError, Result};

/// Key under which every record stores its row position.
pub const INDEX_KEY: &str = "_index";

/// One data row keyed by (whitespace-free) header name.
pub type Record = HashMap<String, String>;

/// Parse tab-separated text into records.
///
/// * Rows end at CR, LF or CRLF; blank lines are dropped.
/// * A cell may be double-quoted to carry tabs or line breaks.
/// * Whitespace inside header names is removed (`"Max Lvl"` → `"MaxLvl"`).
/// * Rows whose first cell is `Expansion` are section markers and skipped,
///   but still count towards `_index`.
///
/// # Errors
///
/// Returns [`MirrorError::DataFormat`] if the text has no header row, is
/// malformed, or a row carries more cells than there are headers.
pub fn parse_tsv(text: &str) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MirrorError::DataFormat(format!("bad header row: {e}")))?
        .iter()
        .map(|header| header.split_whitespace().collect())
        .collect();
    if headers.is_empty() {
        return Err(MirrorError::DataFormat("table has no header row".into()));
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| MirrorError::DataFormat(format!("row {i}: {e}")))?;
        if row.get(0) == Some("Expansion") {
            continue;
        }

        if row.len() > headers.len() {
            return Err(MirrorError::DataFormat(format!(
                "row {i} has {} cells but only {} headers",
                row.len(),
                headers.len()
            )));
        }

        let mut record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        record.insert(INDEX_KEY.to_string(), i.to_string());
        records.push(record);
    }

    debug!(rows = records.len(), columns = headers.len(), "parsed tab-separated table");
    Ok(records)
}

/// Read and parse a tab-separated file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_tsv(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)?;
    parse_tsv(&text)
}
