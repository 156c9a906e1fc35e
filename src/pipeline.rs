//! Geospatial query orchestration: cached fetch, then shape-aware
//! normalization into canonical rows.

use std::time::Duration;

use log::info;
use serde_json::Value as JsonValue;

use crate::cache::{DEFAULT_TTL, FetchCache};
use crate::client::{LocationClient, LocationQuery};
use crate::error::AirqError;
use crate::normalize::{CanonicalRow, normalize};

/// Owns the TTL cache and the remote client for the lifetime of the
/// process. An empty row collection is a valid outcome, not an error;
/// callers report it as an explicit "no data" state.
pub struct LocationQueryPipeline<C: LocationClient> {
    client: C,
    cache: FetchCache<LocationQuery, Vec<JsonValue>>,
    ttl: Duration,
}

impl<C: LocationClient> LocationQueryPipeline<C> {
    pub fn new(client: C) -> Self {
        Self::with_ttl(client, DEFAULT_TTL)
    }

    pub fn with_ttl(client: C, ttl: Duration) -> Self {
        Self {
            client,
            cache: FetchCache::new(),
            ttl,
        }
    }

    /// Fetches (or reuses) the raw payload for `query` and flattens it into
    /// canonical rows. Radius and limit pass through numerically; only the
    /// remote API enforces its own bounds.
    pub fn query(&mut self, query: &LocationQuery) -> Result<Vec<CanonicalRow>, AirqError> {
        let client = &self.client;
        let raw = self
            .cache
            .get_or_fetch(query.clone(), self.ttl, || client.fetch_raw(query))?;
        let rows = normalize(&raw, query.endpoint.shape());
        info!(
            "Normalized {} raw record(s) into {} row(s)",
            raw.len(),
            rows.len()
        );
        Ok(rows)
    }
}
