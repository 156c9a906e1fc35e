use std::fmt;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Declared scalar type of one table column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Timestamp,
    Duration,
}

impl ColumnType {
    /// Integer and Float participate in correlation; Timestamp and
    /// Duration are profiled numerically but stay out of the matrix.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Timestamp | ColumnType::Duration)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Duration => "duration",
        };
        write!(f, "{label}")
    }
}

/// One typed cell. Empty cells are represented as `None` outside this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Duration(TimeDelta),
}

impl CellValue {
    /// Canonical textual rendering. Every variant renders to a string that
    /// [`parse_typed_value`] accepts back for the same type, which is what
    /// makes any-to-text retyping lossless.
    pub fn as_display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => {
                // The i64 cast saturates outside its range, so whole floats
                // beyond it render through float Display instead.
                if f.fract() == 0.0 && f.is_finite() && in_i64_range(*f) {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Duration(d) => format_duration(d),
        }
    }
}

// Upper bound is exclusive: `i64::MAX as f64` rounds up to 2^63, which no
// i64 holds. Whole f64 values inside the range cast exactly.
fn in_i64_range(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    // Date-only inputs resolve to midnight.
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("Failed to derive midnight for '{value}'"));
        }
    }
    Err(anyhow!("Failed to parse '{value}' as timestamp"))
}

/// Accepts `H:MM:SS` (any number of hours, optional leading `-`), a bare
/// second count, or a single-unit suffixed form such as `90s`, `15m`, `2h`,
/// `1d`.
pub fn parse_duration(value: &str) -> Result<TimeDelta> {
    let trimmed = value.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let seconds = duration_body_seconds(body)
        .ok_or_else(|| anyhow!("Failed to parse '{value}' as duration"))?;
    let delta = TimeDelta::seconds(seconds);
    Ok(if negative { -delta } else { delta })
}

fn duration_body_seconds(body: &str) -> Option<i64> {
    if body.is_empty() {
        return None;
    }
    if body.contains(':') {
        let parts = body.split(':').collect::<Vec<_>>();
        if parts.len() != 3 {
            return None;
        }
        let hours = parts[0].parse::<i64>().ok()?;
        let minutes = parts[1].parse::<i64>().ok()?;
        let seconds = parts[2].parse::<i64>().ok()?;
        if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return None;
        }
        return Some(hours * 3600 + minutes * 60 + seconds);
    }
    if let Ok(seconds) = body.parse::<i64>() {
        return (seconds >= 0).then_some(seconds);
    }
    let unit = body.chars().next_back()?;
    let digits = &body[..body.len() - unit.len_utf8()];
    let magnitude = digits.parse::<i64>().ok()?;
    if magnitude < 0 {
        return None;
    }
    match unit {
        's' => Some(magnitude),
        'm' => Some(magnitude * 60),
        'h' => Some(magnitude * 3600),
        'd' => Some(magnitude * 86_400),
        _ => None,
    }
}

pub fn format_duration(delta: &TimeDelta) -> String {
    let total = delta.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let magnitude = total.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        magnitude / 3600,
        (magnitude % 3600) / 60,
        magnitude % 60
    )
}

/// Parses one raw cell into a typed value. Empty input is a `None` cell for
/// every target type.
pub fn parse_typed_value(value: &str, ty: &ColumnType) -> Result<Option<CellValue>> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = match ty {
        ColumnType::Text => CellValue::Text(value.to_string()),
        ColumnType::Integer => {
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            CellValue::Integer(parsed)
        }
        ColumnType::Float => {
            let parsed: f64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            CellValue::Float(parsed)
        }
        ColumnType::Timestamp => CellValue::Timestamp(parse_naive_datetime(value)?),
        ColumnType::Duration => CellValue::Duration(parse_duration(value)?),
    };
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parse_naive_datetime_supports_multiple_formats() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-06 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            parse_naive_datetime("2024-05-06T14:30:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_datetime("06/05/2024 14:30:00").unwrap(),
            expected
        );
        assert_eq!(parse_naive_datetime("2024-05-06 14:30").unwrap(), expected);
    }

    #[test]
    fn parse_naive_datetime_accepts_bare_dates_as_midnight() {
        let parsed = parse_naive_datetime("2024-05-06").unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn parse_duration_supports_clock_and_suffix_forms() {
        assert_eq!(parse_duration("1:30:05").unwrap(), TimeDelta::seconds(5405));
        assert_eq!(parse_duration("90s").unwrap(), TimeDelta::seconds(90));
        assert_eq!(parse_duration("15m").unwrap(), TimeDelta::seconds(900));
        assert_eq!(parse_duration("2h").unwrap(), TimeDelta::seconds(7200));
        assert_eq!(parse_duration("1d").unwrap(), TimeDelta::seconds(86_400));
        assert_eq!(parse_duration("-0:01:00").unwrap(), TimeDelta::seconds(-60));
        assert!(parse_duration("1:75:00").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn format_duration_round_trips_through_parse() {
        let delta = TimeDelta::seconds(5405);
        assert_eq!(format_duration(&delta), "1:30:05");
        assert_eq!(parse_duration(&format_duration(&delta)).unwrap(), delta);

        let negative = TimeDelta::seconds(-61);
        assert_eq!(format_duration(&negative), "-0:01:01");
        assert_eq!(
            parse_duration(&format_duration(&negative)).unwrap(),
            negative
        );
    }

    #[test]
    fn parse_typed_value_handles_empty_and_numeric_inputs() {
        assert_eq!(parse_typed_value("", &ColumnType::Integer).unwrap(), None);
        assert_eq!(
            parse_typed_value("42", &ColumnType::Integer).unwrap(),
            Some(CellValue::Integer(42))
        );
        assert_eq!(
            parse_typed_value("4.5", &ColumnType::Float).unwrap(),
            Some(CellValue::Float(4.5))
        );
        assert!(parse_typed_value("x", &ColumnType::Float).is_err());
    }

    #[test]
    fn float_display_drops_trailing_zero_fraction() {
        assert_eq!(CellValue::Float(3.0).as_display(), "3");
        assert_eq!(CellValue::Float(3.25).as_display(), "3.25");
    }

    #[test]
    fn float_display_preserves_whole_values_beyond_i64_range() {
        assert_eq!(
            CellValue::Float(1e20).as_display(),
            "100000000000000000000"
        );
        assert_eq!(
            CellValue::Float(-1e20).as_display(),
            "-100000000000000000000"
        );
        // The rendering still parses back as the same float.
        assert_eq!(
            parse_typed_value(&CellValue::Float(1e20).as_display(), &ColumnType::Float).unwrap(),
            Some(CellValue::Float(1e20))
        );
    }
}
