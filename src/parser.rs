use anyhow::Result;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;

use crate::models::Dataset;

/// Parses one comma-separated object whose first row is the header.
///
/// Short rows are padded with nulls, cells past the header width are dropped
/// and empty cells become nulls.
pub fn parse_csv<R: Read>(reader: R) -> Result<Dataset> {
    parse(reader, None)
}

/// Parses an object that continues an existing dataset: its header row is
/// skipped and cells are kept by position, fitted to `width` columns.
pub fn parse_csv_rows<R: Read>(reader: R, width: usize) -> Result<Vec<Vec<Option<String>>>> {
    Ok(parse(reader, Some(width))?.rows)
}

fn parse<R: Read>(reader: R, width: Option<usize>) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| column_name(i, h))
        .collect();

    let width = width.unwrap_or(columns.len());
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        rows.push((0..width).map(|i| read_cell(&record, i)).collect());
    }

    Ok(Dataset { columns, rows })
}

// Unnamed header cells get positional names
fn column_name(index: usize, header: &str) -> String {
    if header.is_empty() {
        format!("_c{index}")
    } else {
        header.to_string()
    }
}

fn read_cell(record: &StringRecord, index: usize) -> Option<String> {
    match record.get(index) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => None,
    }
}
