//! Descriptive statistics and correlation over a typed table.
//!
//! Numeric and temporal columns profile through an f64 metric space
//! (timestamps as epoch seconds, durations as seconds) and render back in
//! their own unit. Text columns get categorical summaries. Correlation is
//! Pearson over pairwise-complete rows, restricted to integer and float
//! columns.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::data::{CellValue, ColumnType, format_duration};
use crate::error::AirqError;
use crate::frame::{Column, TypedTable};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric {
        count: usize,
        mean: Option<f64>,
        std_dev: Option<f64>,
        min: Option<f64>,
        q1: Option<f64>,
        median: Option<f64>,
        q3: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        count: usize,
        unique: usize,
        most_frequent: Option<(String, usize)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub datatype: ColumnType,
    pub summary: ColumnSummary,
}

/// One [`ColumnStats`] per column, in table order.
pub fn describe(table: &TypedTable) -> Vec<ColumnStats> {
    table
        .columns
        .iter()
        .map(|column| ColumnStats {
            name: column.name.clone(),
            datatype: column.datatype,
            summary: if column.datatype.is_numeric() || column.datatype.is_temporal() {
                numeric_summary(column)
            } else {
                categorical_summary(column)
            },
        })
        .collect()
}

fn numeric_summary(column: &Column) -> ColumnSummary {
    let mut values = column
        .values
        .iter()
        .flatten()
        .filter_map(cell_metric)
        .collect::<Vec<_>>();
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std_dev = (count > 1).then(|| {
        let mean = mean.unwrap_or_default();
        let sum_squares = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
        (sum_squares / (count as f64 - 1.0)).sqrt()
    });
    ColumnSummary::Numeric {
        count,
        mean,
        std_dev,
        min: values.first().copied(),
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

// Linear interpolation between closest ranks, over pre-sorted values.
fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn categorical_summary(column: &Column) -> ColumnSummary {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut count = 0usize;
    for value in column.values.iter().flatten() {
        count += 1;
        *counts.entry(value.as_display()).or_insert(0) += 1;
    }
    let most_frequent = counts
        .iter()
        // Ties break toward the lexicographically smaller value so output
        // is deterministic.
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, n)| (value.clone(), *n));
    ColumnSummary::Categorical {
        count,
        unique: counts.len(),
        most_frequent,
    }
}

fn cell_metric(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Integer(i) => Some(*i as f64),
        CellValue::Float(f) => Some(*f),
        CellValue::Timestamp(ts) => Some(ts.and_utc().timestamp() as f64),
        CellValue::Duration(d) => Some(d.num_seconds() as f64),
        CellValue::Text(_) => None,
    }
}

/// Square Pearson correlation matrix indexed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.columns.len() + col]
    }

    pub fn size(&self) -> usize {
        self.columns.len()
    }
}

/// Pearson correlation over pairwise-complete rows of the numeric columns.
///
/// `selection` restricts the matrix to the named columns (unknown names are
/// an error; non-numeric names are ignored). With no numeric column left,
/// fails with [`AirqError::InsufficientData`] rather than returning a
/// degenerate matrix. The diagonal is exactly 1.0; an off-diagonal pair
/// with fewer than two complete rows or zero variance yields NaN.
pub fn correlation_matrix(
    table: &TypedTable,
    selection: Option<&[String]>,
) -> Result<CorrelationMatrix, AirqError> {
    let candidates: Vec<&Column> = match selection {
        Some(names) => names
            .iter()
            .map(|name| {
                table.column(name).ok_or_else(|| AirqError::UnknownColumn {
                    column: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => table.columns.iter().collect(),
    };
    let numeric: Vec<&Column> = candidates
        .into_iter()
        .filter(|c| c.datatype.is_numeric())
        .collect();
    if numeric.is_empty() {
        return Err(AirqError::InsufficientData);
    }

    let size = numeric.len();
    let mut values = vec![f64::NAN; size * size];
    for i in 0..size {
        values[i * size + i] = 1.0;
        for j in (i + 1)..size {
            let r = pairwise_pearson(numeric[i], numeric[j]);
            values[i * size + j] = r;
            values[j * size + i] = r;
        }
    }
    Ok(CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

fn pairwise_pearson(a: &Column, b: &Column) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .values
        .iter()
        .zip(&b.values)
        .filter_map(|(left, right)| {
            let x = left.as_ref().and_then(cell_metric)?;
            let y = right.as_ref().and_then(cell_metric)?;
            Some((x, y))
        })
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }
    if variance_x == 0.0 || variance_y == 0.0 {
        return f64::NAN;
    }
    covariance / (variance_x * variance_y).sqrt()
}

/// Renders describe output as table rows: one row per column, blank cells
/// where a metric does not apply to the column kind.
pub fn describe_rows(stats: &[ColumnStats]) -> Vec<Vec<String>> {
    stats
        .iter()
        .map(|stat| match &stat.summary {
            ColumnSummary::Numeric {
                count,
                mean,
                std_dev,
                min,
                q1,
                median,
                q3,
                max,
            } => vec![
                stat.name.clone(),
                stat.datatype.to_string(),
                count.to_string(),
                format_metric(*mean, &stat.datatype),
                format_spread(*std_dev, &stat.datatype),
                format_metric(*min, &stat.datatype),
                format_metric(*q1, &stat.datatype),
                format_metric(*median, &stat.datatype),
                format_metric(*q3, &stat.datatype),
                format_metric(*max, &stat.datatype),
                String::new(),
                String::new(),
            ],
            ColumnSummary::Categorical {
                count,
                unique,
                most_frequent,
            } => {
                let mut row = vec![stat.name.clone(), stat.datatype.to_string(), count.to_string()];
                row.extend(std::iter::repeat_n(String::new(), 7));
                row.push(unique.to_string());
                row.push(
                    most_frequent
                        .as_ref()
                        .map(|(value, n)| format!("{value} ({n})"))
                        .unwrap_or_default(),
                );
                row
            }
        })
        .collect()
}

pub fn describe_headers() -> Vec<String> {
    [
        "column", "type", "count", "mean", "std_dev", "min", "q1", "median", "q3", "max",
        "unique", "top",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Renders the correlation matrix as table rows with a leading name column.
pub fn correlation_rows(matrix: &CorrelationMatrix) -> Vec<Vec<String>> {
    (0..matrix.size())
        .map(|row| {
            let mut cells = vec![matrix.columns[row].clone()];
            for col in 0..matrix.size() {
                let value = matrix.get(row, col);
                cells.push(if value.is_nan() {
                    String::new()
                } else {
                    format!("{value:.4}")
                });
            }
            cells
        })
        .collect()
}

fn format_metric(metric: Option<f64>, datatype: &ColumnType) -> String {
    let Some(value) = metric else {
        return String::new();
    };
    match datatype {
        ColumnType::Timestamp => DateTime::<Utc>::from_timestamp(value.round() as i64, 0)
            .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        ColumnType::Duration => format_duration(&TimeDelta::seconds(value.round() as i64)),
        _ => format_number(value),
    }
}

// Spread metrics for temporal columns are durations, not points in time.
fn format_spread(metric: Option<f64>, datatype: &ColumnType) -> String {
    let Some(value) = metric else {
        return String::new();
    };
    match datatype {
        ColumnType::Timestamp | ColumnType::Duration => format!("{} seconds", format_number(value)),
        _ => format_number(value),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}
