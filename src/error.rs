use thiserror::Error;

use crate::data::ColumnType;

/// Failure taxonomy for the ingestion and analysis pipelines.
///
/// Every variant is reported at the command boundary as a single
/// human-readable message; none of them abort the process.
#[derive(Debug, Error)]
pub enum AirqError {
    /// The remote monitoring API call failed: transport error, non-2xx
    /// status, or a payload that did not parse as the expected JSON.
    #[error("upstream request failed: {reason}")]
    Upstream { reason: String },

    /// The uploaded file extension is neither CSV nor a recognized
    /// spreadsheet format.
    #[error(
        "unsupported file format: '{filename}' (expected csv, tsv, xlsx, xls, xlsm, xlsb, or ods)"
    )]
    UnsupportedFormat { filename: String },

    /// A column retype failed for at least one value. The table is left
    /// exactly as it was before the call.
    #[error("cannot coerce column '{column}' to {target}: value '{value}' does not parse")]
    Coercion {
        column: String,
        target: ColumnType,
        value: String,
    },

    /// Correlation requested over a selection with no numeric columns.
    #[error("correlation requires at least one numeric column")]
    InsufficientData,

    /// A named column does not exist in the table.
    #[error("column '{column}' not found in table")]
    UnknownColumn { column: String },
}

impl AirqError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        AirqError::Upstream {
            reason: reason.into(),
        }
    }
}
