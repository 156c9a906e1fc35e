//! In-memory typed table and column retyping.
//!
//! A [`TypedTable`] is an ordered sequence of named columns, each with a
//! declared scalar type and one optional cell per row. Retyping is atomic
//! per column: either every value parses as the target type and the column
//! is swapped wholesale, or the table is left exactly as it was.

use std::io::Write;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};

use crate::data::{CellValue, ColumnType, parse_typed_value};
use crate::error::AirqError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
    pub values: Vec<Option<CellValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedTable {
    pub columns: Vec<Column>,
}

impl TypedTable {
    /// Builds a table, enforcing that every column carries the same row
    /// count.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.values.len();
            for column in &columns {
                ensure!(
                    column.values.len() == expected,
                    "Column '{}' has {} row(s), expected {}",
                    column.name,
                    column.values.len(),
                    expected
                );
            }
        }
        Ok(Self { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Reassigns the declared type of one column, re-parsing its values.
    ///
    /// Parses into a scratch vector first and swaps only on full success,
    /// so a failure leaves the table byte-for-byte unchanged. Empty cells
    /// stay empty. Any type retypes to text losslessly via its canonical
    /// display form.
    pub fn coerce(&mut self, column_name: &str, target: ColumnType) -> Result<(), AirqError> {
        let index = self
            .column_index(column_name)
            .ok_or_else(|| AirqError::UnknownColumn {
                column: column_name.to_string(),
            })?;
        let column = &self.columns[index];
        if column.datatype == target {
            return Ok(());
        }

        let mut retyped = Vec::with_capacity(column.values.len());
        for value in &column.values {
            let cell = match value {
                None => None,
                Some(current) => Some(recast(current, target).ok_or_else(|| {
                    AirqError::Coercion {
                        column: column_name.to_string(),
                        target,
                        value: current.as_display(),
                    }
                })?),
            };
            retyped.push(cell);
        }

        let column = &mut self.columns[index];
        column.values = retyped;
        column.datatype = target;
        Ok(())
    }

    /// Rows rendered as display strings for table output; empty cells
    /// render as empty strings.
    pub fn display_rows(&self, limit: Option<usize>) -> Vec<Vec<String>> {
        let count = match limit {
            Some(limit) => self.row_count().min(limit),
            None => self.row_count(),
        };
        (0..count)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        column.values[row]
                            .as_ref()
                            .map(CellValue::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::WriterBuilder::new().from_writer(writer);
        out.write_record(self.headers())
            .context("Writing CSV header")?;
        for row in self.display_rows(None) {
            out.write_record(&row).context("Writing CSV row")?;
        }
        out.flush().context("Flushing CSV output")?;
        Ok(())
    }
}

fn recast(value: &CellValue, target: ColumnType) -> Option<CellValue> {
    match (value, target) {
        (_, ColumnType::Text) => Some(CellValue::Text(value.as_display())),
        (CellValue::Integer(i), ColumnType::Float) => Some(CellValue::Float(*i as f64)),
        // Integers retype to timestamps as Unix epoch seconds.
        (CellValue::Integer(i), ColumnType::Timestamp) => {
            DateTime::<Utc>::from_timestamp(*i, 0).map(|dt| CellValue::Timestamp(dt.naive_utc()))
        }
        // Everything else re-parses through the canonical display form.
        _ => parse_typed_value(&value.as_display(), &target).ok().flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_column(name: &str, values: &[&str]) -> Column {
        Column {
            name: name.to_string(),
            datatype: ColumnType::Text,
            values: values
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        None
                    } else {
                        Some(CellValue::Text(v.to_string()))
                    }
                })
                .collect(),
        }
    }

    fn sample_table() -> TypedTable {
        TypedTable::from_columns(vec![
            text_column("station", &["A", "B", "C"]),
            text_column("reading", &["1", "2", "x"]),
        ])
        .unwrap()
    }

    #[test]
    fn from_columns_rejects_uneven_lengths() {
        let result = TypedTable::from_columns(vec![
            text_column("a", &["1"]),
            text_column("b", &["1", "2"]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn coerce_failure_leaves_table_unchanged() {
        let mut table = sample_table();
        let before = table.clone();
        let err = table.coerce("reading", ColumnType::Integer).unwrap_err();
        match err {
            AirqError::Coercion {
                column,
                target,
                value,
            } => {
                assert_eq!(column, "reading");
                assert_eq!(target, ColumnType::Integer);
                assert_eq!(value, "x");
            }
            other => panic!("Expected coercion error, got {other:?}"),
        }
        assert_eq!(table, before);
    }

    #[test]
    fn coerce_to_integer_succeeds_on_clean_column() {
        let mut table = TypedTable::from_columns(vec![text_column("n", &["1", "2", "3"])]).unwrap();
        table.coerce("n", ColumnType::Integer).unwrap();
        let column = table.column("n").unwrap();
        assert_eq!(column.datatype, ColumnType::Integer);
        assert_eq!(
            column.values,
            vec![
                Some(CellValue::Integer(1)),
                Some(CellValue::Integer(2)),
                Some(CellValue::Integer(3)),
            ]
        );
    }

    #[test]
    fn coerce_touches_only_the_named_column() {
        let mut table = sample_table();
        let station_before = table.column("station").unwrap().clone();
        table.coerce("station", ColumnType::Text).unwrap();
        let _ = table.coerce("reading", ColumnType::Integer);
        assert_eq!(*table.column("station").unwrap(), station_before);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn numeric_to_text_never_fails() {
        let mut table = TypedTable::from_columns(vec![Column {
            name: "v".to_string(),
            datatype: ColumnType::Float,
            values: vec![Some(CellValue::Float(1.5)), None, Some(CellValue::Float(2.0))],
        }])
        .unwrap();
        table.coerce("v", ColumnType::Text).unwrap();
        let column = table.column("v").unwrap();
        assert_eq!(column.datatype, ColumnType::Text);
        assert_eq!(
            column.values,
            vec![
                Some(CellValue::Text("1.5".to_string())),
                None,
                Some(CellValue::Text("2".to_string())),
            ]
        );
    }

    #[test]
    fn float_to_integer_requires_whole_numbers() {
        let mut table = TypedTable::from_columns(vec![Column {
            name: "v".to_string(),
            datatype: ColumnType::Float,
            values: vec![Some(CellValue::Float(3.0)), Some(CellValue::Float(3.5))],
        }])
        .unwrap();
        assert!(table.coerce("v", ColumnType::Integer).is_err());
        assert_eq!(table.column("v").unwrap().datatype, ColumnType::Float);
    }

    #[test]
    fn integer_to_timestamp_uses_epoch_seconds() {
        let mut table = TypedTable::from_columns(vec![Column {
            name: "t".to_string(),
            datatype: ColumnType::Integer,
            values: vec![Some(CellValue::Integer(0))],
        }])
        .unwrap();
        table.coerce("t", ColumnType::Timestamp).unwrap();
        match table.column("t").unwrap().values[0].as_ref().unwrap() {
            CellValue::Timestamp(ts) => {
                assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "1970-01-01 00:00:00");
            }
            other => panic!("Expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn text_to_duration_parses_clock_values() {
        let mut table =
            TypedTable::from_columns(vec![text_column("d", &["0:01:30", "45s", ""])]).unwrap();
        table.coerce("d", ColumnType::Duration).unwrap();
        let column = table.column("d").unwrap();
        assert_eq!(column.datatype, ColumnType::Duration);
        assert_eq!(column.values[2], None);
    }

    #[test]
    fn unknown_column_is_reported_by_name() {
        let mut table = sample_table();
        let err = table.coerce("missing", ColumnType::Text).unwrap_err();
        assert!(matches!(err, AirqError::UnknownColumn { .. }));
    }

    #[test]
    fn write_csv_renders_empty_cells_as_empty_strings() {
        let table = TypedTable::from_columns(vec![
            text_column("k", &["a", "b"]),
            text_column("v", &["1", ""]),
        ])
        .unwrap();
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "k,v\na,1\nb,\n");
    }
}
