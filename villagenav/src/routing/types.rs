//! Route types and errors.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::http::HttpError;

/// Which tier of the resolution chain produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteProvider {
    /// Street-network router without credentials (OSRM).
    Primary,
    /// Street-network router requiring an API key (OpenRouteService).
    Secondary,
    /// Straight line between start and end.
    Fallback,
}

impl std::fmt::Display for RouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A walking route.
///
/// Always has at least two points. Replaced wholesale on recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coordinates: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub provider: RouteProvider,
}

impl Route {
    pub fn start(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }
}

/// Errors from route resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Transport failure talking to a routing service.
    #[error("Routing request failed: {0}")]
    Http(String),

    /// The routing service answered with an error status.
    #[error("Routing service returned HTTP {0}")]
    HttpStatus(u16),

    /// The payload was malformed, empty or reported no route.
    #[error("Invalid routing response: {0}")]
    InvalidResponse(String),

    /// The provider needs a credential that is not configured.
    #[error("{provider} requires an API key")]
    MissingCredential { provider: String },

    /// The attempt exceeded its time budget.
    #[error("Routing request timed out after {0:?}")]
    Timeout(Duration),

    /// Start or end is not a valid coordinate.
    #[error("Invalid route coordinates: {start} -> {end}")]
    InvalidCoordinates { start: Coordinate, end: Coordinate },

    /// A newer route request replaced this one.
    #[error("Route request superseded by a newer one")]
    Superseded,

    /// The resolver has no strategies configured.
    #[error("No routing provider configured")]
    NoProvider,
}

impl From<HttpError> for RoutingError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Status { status, .. } => Self::HttpStatus(status),
            HttpError::Transport(msg) | HttpError::Body(msg) => Self::Http(msg),
        }
    }
}

/// A single way of computing a route.
pub trait RouteStrategy: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Tier reported on routes from this strategy.
    fn tier(&self) -> RouteProvider;

    /// Time budget for one attempt, `None` for unbounded local computation.
    fn timeout(&self) -> Option<Duration>;

    /// Synchronous readiness check. An error skips the strategy without any
    /// network traffic.
    fn check_ready(&self) -> Result<(), RoutingError> {
        Ok(())
    }

    /// Compute a route from `start` to `end`.
    fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<Route, RoutingError>> + Send;
}

/// Check that a street-network route is usable and convert its geometry.
pub(crate) fn validate_geometry(points: &[[f64; 2]]) -> Result<Vec<Coordinate>, RoutingError> {
    if points.len() < 2 {
        return Err(RoutingError::InvalidResponse(format!(
            "route geometry has {} point(s)",
            points.len()
        )));
    }

    let coordinates: Vec<Coordinate> = points.iter().copied().map(Coordinate::from_pair).collect();
    if let Some(bad) = coordinates.iter().find(|c| !c.is_valid()) {
        return Err(RoutingError::InvalidResponse(format!(
            "route geometry has invalid point {}",
            bad
        )));
    }

    Ok(coordinates)
}

/// Check that distance and duration are usable numbers.
pub(crate) fn validate_summary(distance: f64, duration: f64) -> Result<(), RoutingError> {
    if !distance.is_finite() || distance < 0.0 || !duration.is_finite() || duration < 0.0 {
        return Err(RoutingError::InvalidResponse(format!(
            "invalid route summary: distance={}, duration={}",
            distance, duration
        )));
    }
    Ok(())
}
