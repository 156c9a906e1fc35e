//! Upload ingestion: raw bytes plus a declared filename become a
//! [`TypedTable`].
//!
//! Format dispatch is extension-based: `csv`/`tsv` route through the csv
//! crate, spreadsheet extensions through calamine. Typing defers to what
//! the source structure implies: spreadsheet cells carry native types,
//! while CSV columns take the narrowest of integer, float, or text across
//! their non-empty cells.

use std::io::Cursor;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, DataType as _, Reader, open_workbook_auto_from_rs};
use log::info;

use crate::data::{CellValue, ColumnType, parse_typed_value};
use crate::error::AirqError;
use crate::frame::{Column, TypedTable};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

pub fn ingest(bytes: &[u8], declared_filename: &str) -> Result<TypedTable> {
    let extension = declared_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" => ingest_delimited(bytes, b',')?,
        "tsv" => ingest_delimited(bytes, b'\t')?,
        ext if SPREADSHEET_EXTENSIONS.contains(&ext) => ingest_spreadsheet(bytes)?,
        _ => {
            return Err(AirqError::UnsupportedFormat {
                filename: declared_filename.to_string(),
            }
            .into());
        }
    };
    info!(
        "Ingested '{}': {} column(s), {} row(s)",
        declared_filename,
        table.columns.len(),
        table.row_count()
    );
    Ok(table)
}

// Fully blank lines are skipped by the reader and contribute no row; an
// empty field inside a row becomes an empty cell.
fn ingest_delimited(bytes: &[u8], delimiter: u8) -> Result<TypedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .context("Reading delimited header row")?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        for (col_idx, cell) in record.iter().enumerate().take(headers.len()) {
            cells[col_idx].push(cell.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let datatype = narrowest_type(&raw);
            let values = raw
                .iter()
                .map(|cell| parse_typed_value(cell, &datatype))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Typing column '{name}'"))?;
            Ok(Column {
                name,
                datatype,
                values,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    TypedTable::from_columns(columns)
}

// Candidate elimination over non-empty cells: integer until a cell breaks
// it, then float, then text. All-empty columns stay text.
fn narrowest_type(cells: &[String]) -> ColumnType {
    let mut possible_integer = true;
    let mut possible_float = true;
    let mut saw_value = false;
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        saw_value = true;
        if possible_integer && cell.parse::<i64>().is_err() {
            possible_integer = false;
        }
        if possible_float && cell.parse::<f64>().is_err() {
            possible_float = false;
        }
        if !possible_integer && !possible_float {
            return ColumnType::Text;
        }
    }
    match (saw_value, possible_integer, possible_float) {
        (false, _, _) => ColumnType::Text,
        (true, true, _) => ColumnType::Integer,
        (true, false, true) => ColumnType::Float,
        _ => ColumnType::Text,
    }
}

fn ingest_spreadsheet(bytes: &[u8]) -> Result<TypedTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("Opening spreadsheet workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook contains no worksheets"))?
        .context("Reading first worksheet")?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| anyhow!("Worksheet has no header row"))?
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("column_{}", idx + 1),
            other => other.to_string(),
        })
        .collect::<Vec<_>>();

    let mut cells: Vec<Vec<Data>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col_idx, slot) in cells.iter_mut().enumerate() {
            slot.push(row.get(col_idx).cloned().unwrap_or(Data::Empty));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let datatype = native_sheet_type(&raw);
            let values = raw.iter().map(|cell| sheet_cell(cell, &datatype)).collect();
            Column {
                name,
                datatype,
                values,
            }
        })
        .collect();
    TypedTable::from_columns(columns)
}

// Spreadsheet cells are already typed; the column takes the narrowest type
// covering every non-empty cell.
fn native_sheet_type(cells: &[Data]) -> ColumnType {
    let mut possible_integer = true;
    let mut possible_float = true;
    let mut possible_timestamp = true;
    let mut saw_value = false;
    for cell in cells {
        match cell {
            Data::Empty => continue,
            Data::Int(_) => possible_timestamp = false,
            Data::Float(f) => {
                possible_timestamp = false;
                if f.fract() != 0.0 {
                    possible_integer = false;
                }
            }
            Data::DateTime(_) | Data::DateTimeIso(_) => {
                possible_integer = false;
                possible_float = false;
            }
            _ => {
                possible_integer = false;
                possible_float = false;
                possible_timestamp = false;
            }
        }
        saw_value = true;
    }
    match (saw_value, possible_integer, possible_float, possible_timestamp) {
        (false, ..) => ColumnType::Text,
        (true, _, _, true) => ColumnType::Timestamp,
        (true, true, _, _) => ColumnType::Integer,
        (true, false, true, _) => ColumnType::Float,
        _ => ColumnType::Text,
    }
}

fn sheet_cell(cell: &Data, datatype: &ColumnType) -> Option<CellValue> {
    match (cell, datatype) {
        (Data::Empty, _) => None,
        (Data::Int(i), ColumnType::Integer) => Some(CellValue::Integer(*i)),
        (Data::Float(f), ColumnType::Integer) => Some(CellValue::Integer(*f as i64)),
        (Data::Int(i), ColumnType::Float) => Some(CellValue::Float(*i as f64)),
        (Data::Float(f), ColumnType::Float) => Some(CellValue::Float(*f)),
        (_, ColumnType::Timestamp) => cell.as_datetime().map(CellValue::Timestamp),
        (other, _) => Some(CellValue::Text(other.to_string())),
    }
}
