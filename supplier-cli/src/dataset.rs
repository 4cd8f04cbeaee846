//! CSV dataset loading.
//!
//! The header row names the columns. Every cell is trimmed and empty cells
//! are read as `None`, so the index sees missing values explicitly.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use supplier_rag::{RagError, RawRow, Result};
use tracing::debug;

/// Load every row of the CSV file at `path`.
///
/// # Errors
///
/// Returns [`RagError::Dataset`] if the file cannot be opened or is not
/// well-formed CSV.
pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path)
        .map_err(|e| RagError::Dataset(format!("cannot open {}: {e}", path.display())))?;
    let rows = read_rows(file)?;
    debug!(path = %path.display(), row_count = rows.len(), "loaded dataset");
    Ok(rows)
}

/// Read rows from any CSV source.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RagError::Dataset(format!("cannot read CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut seen = HashSet::new();
    if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(RagError::Dataset(format!("duplicate column '{duplicate}' in CSV header")));
    }

    reader
        .records()
        .map(|record| -> Result<RawRow> {
            let record = record.map_err(|e| RagError::Dataset(format!("invalid CSV row: {e}")))?;
            Ok(headers
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| {
                    let value = (!cell.is_empty()).then(|| cell.to_string());
                    (column.clone(), value)
                })
                .collect())
        })
        .collect()
}
