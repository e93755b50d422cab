//! OpenRouteService walking router.
//!
//! Requires an API key. Without one the router reports itself not ready and
//! the chain skips it without touching the network.
//!
//! # URL Pattern
//!
//! `{base}/v2/directions/foot-walking?start={lon},{lat}&end={lon},{lat}`
//!
//! The key is sent in the `Authorization` header.
//!
//! # Response
//!
//! A GeoJSON feature collection; the first feature carries the geometry and
//! `properties.summary.{distance,duration}`.

use std::time::Duration;

use serde::Deserialize;

use super::types::{
    validate_geometry, validate_summary, Route, RouteProvider, RouteStrategy, RoutingError,
};
use crate::geo::Coordinate;
use crate::http::AsyncHttpClient;

/// Public OpenRouteService API.
pub const DEFAULT_ORS_URL: &str = "https://api.openrouteservice.org";

/// Default time budget for one OpenRouteService request.
pub const DEFAULT_ORS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    summary: Summary,
}

/// ORS omits both fields for a zero-length route.
#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// Walking router backed by OpenRouteService.
pub struct OrsRouter<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl<C: AsyncHttpClient> OrsRouter<C> {
    /// Create a router. An empty key counts as absent.
    pub fn new(
        http_client: C,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    fn build_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/v2/directions/foot-walking?start={},{}&end={},{}",
            self.base_url, start.longitude, start.latitude, end.longitude, end.latitude
        )
    }
}

fn parse_response(body: &[u8]) -> Result<Route, RoutingError> {
    let collection: FeatureCollection = serde_json::from_slice(body).map_err(|e| {
        RoutingError::InvalidResponse(format!("malformed OpenRouteService payload: {}", e))
    })?;

    let feature = collection.features.into_iter().next().ok_or_else(|| {
        RoutingError::InvalidResponse("OpenRouteService returned no features".to_string())
    })?;

    let coordinates = validate_geometry(&feature.geometry.coordinates)?;
    let summary = feature.properties.summary;
    validate_summary(summary.distance, summary.duration)?;

    Ok(Route {
        coordinates,
        distance_meters: summary.distance,
        duration_seconds: summary.duration,
        provider: RouteProvider::Secondary,
    })
}

impl<C: AsyncHttpClient> RouteStrategy for OrsRouter<C> {
    fn name(&self) -> &str {
        "OpenRouteService"
    }

    fn tier(&self) -> RouteProvider {
        RouteProvider::Secondary
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    fn check_ready(&self) -> Result<(), RoutingError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(RoutingError::MissingCredential {
                provider: self.name().to_string(),
            }),
        }
    }

    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, RoutingError> {
        self.check_ready()?;
        let key = self.api_key.as_deref().unwrap_or_default();
        let url = self.build_url(start, end);
        let body = self
            .http_client
            .get_with_headers(
                &url,
                &[
                    ("Authorization", key),
                    ("Accept", "application/geo+json, application/json"),
                ],
            )
            .await?;
        parse_response(&body)
    }
}
