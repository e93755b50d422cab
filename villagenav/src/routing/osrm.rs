//! OSRM walking router.
//!
//! Queries an OSRM server with the `foot` profile. The public demo server
//! needs no credential, which makes it the first choice in the chain.
//!
//! # URL Pattern
//!
//! `{base}/route/v1/foot/{lon1},{lat1};{lon2},{lat2}?overview=full&geometries=geojson`
//!
//! # Response
//!
//! ```json
//! {"code": "Ok", "routes": [{"geometry": {"coordinates": [[lon, lat], ...]},
//!   "distance": 412.3, "duration": 296.1}]}
//! ```

use std::time::Duration;

use serde::Deserialize;

use super::types::{
    validate_geometry, validate_summary, Route, RouteProvider, RouteStrategy, RoutingError,
};
use crate::geo::Coordinate;
use crate::http::AsyncHttpClient;

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Default time budget for one OSRM request.
pub const DEFAULT_OSRM_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: LineString,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

/// Walking router backed by OSRM.
pub struct OsrmRouter<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    timeout: Duration,
}

impl<C: AsyncHttpClient> OsrmRouter<C> {
    pub fn new(http_client: C, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn build_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/foot/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.longitude, start.latitude, end.longitude, end.latitude
        )
    }
}

/// Parse an OSRM route response body.
fn parse_response(body: &[u8]) -> Result<Route, RoutingError> {
    let response: OsrmResponse = serde_json::from_slice(body)
        .map_err(|e| RoutingError::InvalidResponse(format!("malformed OSRM payload: {}", e)))?;

    if response.code != "Ok" {
        return Err(RoutingError::InvalidResponse(format!(
            "OSRM returned {}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::InvalidResponse("OSRM returned no routes".to_string()))?;

    let coordinates = validate_geometry(&route.geometry.coordinates)?;
    validate_summary(route.distance, route.duration)?;

    Ok(Route {
        coordinates,
        distance_meters: route.distance,
        duration_seconds: route.duration,
        provider: RouteProvider::Primary,
    })
}

impl<C: AsyncHttpClient> RouteStrategy for OsrmRouter<C> {
    fn name(&self) -> &str {
        "OSRM"
    }

    fn tier(&self) -> RouteProvider {
        RouteProvider::Primary
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, RoutingError> {
        let url = self.build_url(start, end);
        let body = self.http_client.get(&url).await?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockAsyncHttpClient;

    const OK_BODY: &str = r#"{
        "code": "Ok",
        "routes": [{
            "geometry": {"type": "LineString", "coordinates": [[120.9513, 14.3478], [120.9520, 14.3482], [120.9531, 14.3490]]},
            "distance": 240.5,
            "duration": 172.0,
            "legs": []
        }],
        "waypoints": []
    }"#;

    #[test]
    fn test_build_url() {
        let router = OsrmRouter::new(
            MockAsyncHttpClient::new(),
            "https://router.project-osrm.org/",
            DEFAULT_OSRM_TIMEOUT,
        );
        let url = router.build_url(Coordinate::new(120.95, 14.34), Coordinate::new(120.96, 14.35));
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/foot/120.95,14.34;120.96,14.35?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn test_parse_ok_response() {
        let route = parse_response(OK_BODY.as_bytes()).unwrap();
        assert_eq!(route.provider, RouteProvider::Primary);
        assert_eq!(route.coordinates.len(), 3);
        assert_eq!(route.distance_meters, 240.5);
        assert_eq!(route.duration_seconds, 172.0);
    }

    #[test]
    fn test_parse_no_route() {
        let body = br#"{"code": "NoRoute", "message": "Impossible route between points", "routes": []}"#;
        assert!(matches!(
            parse_response(body),
            Err(RoutingError::InvalidResponse(msg)) if msg.contains("NoRoute")
        ));
    }

    #[test]
    fn test_parse_empty_routes() {
        let body = br#"{"code": "Ok", "routes": []}"#;
        assert!(matches!(
            parse_response(body),
            Err(RoutingError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_response(b"<html>502</html>"),
            Err(RoutingError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_route_via_client() {
        let client = MockAsyncHttpClient::new().respond("/route/v1/foot/", OK_BODY);
        let router = OsrmRouter::new(client.clone(), DEFAULT_OSRM_URL, DEFAULT_OSRM_TIMEOUT);

        let route = router
            .route(Coordinate::new(120.9513, 14.3478), Coordinate::new(120.9531, 14.3490))
            .await
            .unwrap();
        assert_eq!(route.provider, RouteProvider::Primary);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_route_http_status() {
        let client = MockAsyncHttpClient::new().fail_status("/route/", 500);
        let router = OsrmRouter::new(client, DEFAULT_OSRM_URL, DEFAULT_OSRM_TIMEOUT);

        let err = router
            .route(Coordinate::new(0.0, 0.0), Coordinate::new(0.1, 0.1))
            .await
            .unwrap_err();
        assert_eq!(err, RoutingError::HttpStatus(500));
    }
}
