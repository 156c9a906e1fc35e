//! Remote monitoring-API collaborator.
//!
//! [`LocationClient`] is the seam between the pipeline and the network;
//! [`OpenAqClient`] is the production implementation over a blocking HTTP
//! agent. Tests substitute their own `LocationClient` and never touch the
//! network.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use log::debug;
use serde_json::Value as JsonValue;

use crate::error::AirqError;
use crate::normalize::RecordShape;

/// Upstream endpoint flavor. Each one responds with a different raw record
/// shape (see [`RecordShape`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/locations`: location records with embedded parameter summaries.
    Locations,
    /// `/latest`: per-location snapshots with nested measurement lists.
    Latest,
    /// `/measurements`: flat one-observation-per-record responses.
    Measurements,
}

impl Endpoint {
    pub fn api_path(&self) -> &'static str {
        match self {
            Endpoint::Locations => "locations",
            Endpoint::Latest => "latest",
            Endpoint::Measurements => "measurements",
        }
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            Endpoint::Locations => RecordShape::LocationParameters,
            Endpoint::Latest => RecordShape::MeasurementList,
            Endpoint::Measurements => RecordShape::FlatMeasurement,
        }
    }
}

/// Full parameter set of one geospatial query. Doubles as the cache key, so
/// equality and hashing cover every field: two queries differing in any
/// parameter are distinct cache entries.
#[derive(Debug, Clone)]
pub struct LocationQuery {
    pub endpoint: Endpoint,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: u32,
    pub limit: u32,
    pub parameter: Option<String>,
    pub location_id: Option<u64>,
}

// Coordinates compare bit-exact so equality agrees with the hash below;
// 0.0 and -0.0 are distinct keys.
impl PartialEq for LocationQuery {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
            && self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
            && self.radius_meters == other.radius_meters
            && self.limit == other.limit
            && self.parameter == other.parameter
            && self.location_id == other.location_id
    }
}

impl Eq for LocationQuery {}

impl Hash for LocationQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
        self.latitude.to_bits().hash(state);
        self.longitude.to_bits().hash(state);
        self.radius_meters.hash(state);
        self.limit.hash(state);
        self.parameter.hash(state);
        self.location_id.hash(state);
    }
}

/// Boundary to the remote monitoring API.
pub trait LocationClient {
    /// Returns the raw result records for one query. Transport failures,
    /// non-2xx statuses, and malformed payloads surface as
    /// [`AirqError::Upstream`].
    fn fetch_raw(&self, query: &LocationQuery) -> Result<Vec<JsonValue>, AirqError>;
}

/// HTTP implementation against an OpenAQ-compatible API.
pub struct OpenAqClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAqClient {
    /// Builds a client with an explicit request timeout; a timed-out call
    /// is reported as an upstream failure like any other transport error.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(20))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

impl LocationClient for OpenAqClient {
    fn fetch_raw(&self, query: &LocationQuery) -> Result<Vec<JsonValue>, AirqError> {
        let url = format!("{}/{}", self.base_url, query.endpoint.api_path());
        debug!("GET {url}");

        let mut request = self
            .agent
            .get(&url)
            .query(
                "coordinates",
                &format!("{},{}", query.latitude, query.longitude),
            )
            .query("radius", &query.radius_meters.to_string())
            .query("limit", &query.limit.to_string());
        if let Some(parameter) = &query.parameter {
            request = request.query("parameter", parameter);
        }
        if let Some(location_id) = query.location_id {
            request = request.query("location_id", &location_id.to_string());
        }
        if let Some(key) = &self.api_key {
            request = request.set("X-API-Key", key);
        }

        let response = request.call().map_err(|err| match err {
            ureq::Error::Status(code, _) => {
                AirqError::upstream(format!("{url} returned status {code}"))
            }
            ureq::Error::Transport(transport) => {
                AirqError::upstream(format!("{url}: {transport}"))
            }
        })?;

        let payload: JsonValue = response
            .into_json()
            .map_err(|err| AirqError::upstream(format!("{url} returned malformed JSON: {err}")))?;
        extract_results(payload)
            .ok_or_else(|| AirqError::upstream(format!("{url} returned no results array")))
    }
}

// Responses wrap records under `results`; older deployments return the bare
// array.
fn extract_results(payload: JsonValue) -> Option<Vec<JsonValue>> {
    match payload {
        JsonValue::Array(records) => Some(records),
        JsonValue::Object(mut obj) => match obj.remove("results") {
            Some(JsonValue::Array(records)) => Some(records),
            _ => None,
        },
        _ => None,
    }
}
