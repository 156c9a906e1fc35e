//! Pollutant selection over a canonical row collection.

use std::collections::BTreeSet;

use crate::normalize::CanonicalRow;

/// Sorted distinct pollutant set, for selection UIs. Casing is exactly as
/// received from the source; display-time normalization is a presentation
/// concern.
pub fn distinct_parameters(rows: &[CanonicalRow]) -> BTreeSet<String> {
    rows.iter().map(|row| row.parameter.clone()).collect()
}

/// Order-preserving subset whose parameter equals `parameter` exactly
/// (case-sensitive). A parameter absent from `rows` yields an empty
/// collection, not an error.
pub fn filter_by_parameter(rows: &[CanonicalRow], parameter: &str) -> Vec<CanonicalRow> {
    rows.iter()
        .filter(|row| row.parameter == parameter)
        .cloned()
        .collect()
}

/// Subset usable for a spatial layer: both coordinates present. Rows
/// without coordinates stay valid for tabular display only.
pub fn with_coordinates(rows: &[CanonicalRow]) -> Vec<CanonicalRow> {
    rows.iter()
        .filter(|row| row.has_coordinates())
        .cloned()
        .collect()
}
