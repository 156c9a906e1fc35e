//! Normalization of raw monitoring-API records into canonical rows.
//!
//! The upstream API has grown several response conventions over time; each
//! endpoint nests coordinates and readings differently. [`normalize()`]
//! flattens any of the supported [`RecordShape`]s into one row per pollutant
//! reading, tolerating absent optional fields rather than dropping data.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Structural convention used by a particular upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// One record per location: a `coordinates` sub-object plus a
    /// `parameters` list where each entry carries its last observed value.
    LocationParameters,
    /// One record per location/time snapshot: coordinates attached once,
    /// individual readings nested under `measurements`.
    MeasurementList,
    /// One record per observation, carrying its own coordinates.
    FlatMeasurement,
}

/// One pollutant reading at one place. The only required field is
/// `parameter`; rows without coordinates stay in the collection but are
/// unusable for map rendering (see [`crate::filter::with_coordinates`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub location: Option<String>,
    pub parameter: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CanonicalRow {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Flattens raw records into canonical rows.
///
/// Output order follows input iteration order, readings-within-record order
/// preserved. A record contributing zero readings contributes zero rows;
/// non-object records contribute nothing. Never fails: absent fields become
/// `None` on the row.
pub fn normalize(records: &[JsonValue], shape: RecordShape) -> Vec<CanonicalRow> {
    let mut rows = Vec::new();
    for record in records {
        let Some(obj) = record.as_object() else {
            continue;
        };
        match shape {
            RecordShape::LocationParameters => {
                let (latitude, longitude) = coordinates_of(record);
                let location = string_field(obj, &["name", "location"]);
                for reading in array_field(obj, "parameters") {
                    push_reading(
                        &mut rows,
                        reading,
                        &location,
                        latitude,
                        longitude,
                        "lastValue",
                    );
                }
            }
            RecordShape::MeasurementList => {
                let (latitude, longitude) = coordinates_of(record);
                let location = string_field(obj, &["location", "name"]);
                for reading in array_field(obj, "measurements") {
                    push_reading(&mut rows, reading, &location, latitude, longitude, "value");
                }
            }
            RecordShape::FlatMeasurement => {
                let (latitude, longitude) = coordinates_of(record);
                let location = string_field(obj, &["location", "name"]);
                push_reading(&mut rows, record, &location, latitude, longitude, "value");
            }
        }
    }
    rows
}

fn push_reading(
    rows: &mut Vec<CanonicalRow>,
    reading: &JsonValue,
    location: &Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    value_key: &str,
) {
    let Some(obj) = reading.as_object() else {
        return;
    };
    // A reading without a parameter name is not a row.
    let Some(parameter) = obj.get("parameter").and_then(parameter_name) else {
        return;
    };
    rows.push(CanonicalRow {
        location: location.clone(),
        parameter,
        value: obj.get(value_key).and_then(JsonValue::as_f64),
        unit: obj
            .get("unit")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        latitude,
        longitude,
    });
}

// Newer API versions expand `parameter` into an object with a `name` field.
fn parameter_name(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(inner) => inner
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn coordinates_of(record: &JsonValue) -> (Option<f64>, Option<f64>) {
    let Some(coords) = record.get("coordinates") else {
        return (None, None);
    };
    (
        coords.get("latitude").and_then(JsonValue::as_f64),
        coords.get("longitude").and_then(JsonValue::as_f64),
    )
}

fn string_field(
    obj: &serde_json::Map<String, JsonValue>,
    candidates: &[&str],
) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| obj.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}

fn array_field<'a>(
    obj: &'a serde_json::Map<String, JsonValue>,
    key: &str,
) -> impl Iterator<Item = &'a JsonValue> {
    obj.get(key)
        .and_then(JsonValue::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_parameters_shape_emits_one_row_per_reading() {
        let records = vec![json!({
            "name": "Kemayoran",
            "coordinates": {"latitude": -6.15, "longitude": 106.84},
            "parameters": [
                {"parameter": "pm25", "lastValue": 41.5, "unit": "µg/m³"},
                {"parameter": "o3", "lastValue": 12.0, "unit": "ppm"},
            ],
        })];
        let rows = normalize(&records, RecordShape::LocationParameters);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.latitude == Some(-6.15)));
        assert!(rows.iter().all(|r| r.longitude == Some(106.84)));
        assert_eq!(rows[0].parameter, "pm25");
        assert_eq!(rows[0].value, Some(41.5));
        assert_eq!(rows[1].parameter, "o3");
        assert_eq!(rows[0].location.as_deref(), Some("Kemayoran"));
    }

    #[test]
    fn missing_coordinates_keep_rows_with_none_position() {
        let records = vec![json!({
            "name": "Mobile unit",
            "parameters": [{"parameter": "pm10", "lastValue": 80.0, "unit": "µg/m³"}],
        })];
        let rows = normalize(&records, RecordShape::LocationParameters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latitude, None);
        assert_eq!(rows[0].longitude, None);
        assert!(!rows[0].has_coordinates());
    }

    #[test]
    fn zero_readings_contribute_zero_rows() {
        let records = vec![json!({
            "name": "Silent",
            "coordinates": {"latitude": 1.0, "longitude": 2.0},
            "parameters": [],
        })];
        assert!(normalize(&records, RecordShape::LocationParameters).is_empty());
    }

    #[test]
    fn readings_without_parameter_are_skipped() {
        let records = vec![json!({
            "name": "Partial",
            "coordinates": {"latitude": 1.0, "longitude": 2.0},
            "parameters": [
                {"lastValue": 3.0, "unit": "ppm"},
                {"parameter": "no2", "lastValue": 7.0, "unit": "ppm"},
            ],
        })];
        let rows = normalize(&records, RecordShape::LocationParameters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parameter, "no2");
    }

    #[test]
    fn measurement_list_shape_shares_snapshot_coordinates() {
        let records = vec![json!({
            "location": "Jakarta Pusat",
            "coordinates": {"latitude": -6.18, "longitude": 106.83},
            "measurements": [
                {"parameter": "co", "value": 0.4, "unit": "ppm"},
                {"parameter": "so2", "value": 0.01, "unit": "ppm"},
                {"parameter": "pm25", "value": 38.0, "unit": "µg/m³"},
            ],
        })];
        let rows = normalize(&records, RecordShape::MeasurementList);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.latitude == Some(-6.18)));
        assert_eq!(
            rows.iter().map(|r| r.parameter.as_str()).collect::<Vec<_>>(),
            vec!["co", "so2", "pm25"]
        );
    }

    #[test]
    fn flat_measurement_shape_is_one_row_per_record() {
        let records = vec![
            json!({
                "location": "A",
                "parameter": "pm25",
                "value": 10.0,
                "unit": "µg/m³",
                "coordinates": {"latitude": 1.0, "longitude": 2.0},
            }),
            json!({
                "location": "B",
                "parameter": {"name": "o3"},
                "value": 3,
            }),
        ];
        let rows = normalize(&records, RecordShape::FlatMeasurement);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].parameter, "o3");
        assert_eq!(rows[1].value, Some(3.0));
        assert_eq!(rows[1].latitude, None);
    }

    #[test]
    fn non_object_records_contribute_nothing() {
        let records = vec![json!(42), json!("text"), json!(null)];
        assert!(normalize(&records, RecordShape::FlatMeasurement).is_empty());
    }
}
