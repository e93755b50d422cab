//! Straight-line fallback router.
//!
//! Always available offline. The route is the great-circle segment from start
//! to end, with duration derived from a nominal walking speed.

use std::time::Duration;

use super::types::{Route, RouteProvider, RouteStrategy, RoutingError};
use crate::geo::{distance_meters, Coordinate};

/// Nominal walking speed in meters per second.
pub const DEFAULT_WALKING_SPEED_MPS: f64 = 1.4;

/// Fallback router drawing a direct line.
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    walking_speed_mps: f64,
}

impl StraightLineRouter {
    /// Create a router. Non-positive speeds fall back to the default.
    pub fn new(walking_speed_mps: f64) -> Self {
        let walking_speed_mps = if walking_speed_mps.is_finite() && walking_speed_mps > 0.0 {
            walking_speed_mps
        } else {
            DEFAULT_WALKING_SPEED_MPS
        };
        Self { walking_speed_mps }
    }

    /// Compute the direct route synchronously.
    pub fn direct(&self, start: Coordinate, end: Coordinate) -> Result<Route, RoutingError> {
        if !start.is_valid() || !end.is_valid() {
            return Err(RoutingError::InvalidCoordinates { start, end });
        }

        let distance = distance_meters(start, end);
        Ok(Route {
            coordinates: vec![start, end],
            distance_meters: distance,
            duration_seconds: distance / self.walking_speed_mps,
            provider: RouteProvider::Fallback,
        })
    }
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self::new(DEFAULT_WALKING_SPEED_MPS)
    }
}

impl RouteStrategy for StraightLineRouter {
    fn name(&self) -> &str {
        "straight line"
    }

    fn tier(&self) -> RouteProvider {
        RouteProvider::Fallback
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, RoutingError> {
        self.direct(start, end)
    }
}
