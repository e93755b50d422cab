//! Arrival detection.
//!
//! Arrival is reported once per navigation session: the first estimate within
//! the threshold yields [`ArrivalStatus::JustArrived`], every later check
//! yields [`ArrivalStatus::AlreadyArrived`] regardless of distance. Only
//! selecting a new destination re-arms the detector.

use serde::{Deserialize, Serialize};

use super::destination::Destination;
use crate::geo::distance_meters;
use crate::position::SmoothedEstimate;

/// Default arrival radius in meters.
pub const DEFAULT_ARRIVAL_THRESHOLD_METERS: f64 = 10.0;

/// Result of an arrival check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "distance_meters", rename_all = "snake_case")]
pub enum ArrivalStatus {
    /// Still walking; distance to the destination in meters.
    EnRoute(f64),
    /// Crossed the threshold on this check.
    JustArrived,
    /// Arrival was already reported this session.
    AlreadyArrived,
}

/// Navigation session flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSession {
    pub active: bool,
    /// One-shot latch, cleared only when a new destination is selected.
    pub arrived: bool,
}

/// One-shot arrival detector.
#[derive(Debug, Clone)]
pub struct ArrivalDetector {
    threshold_meters: f64,
    session: NavigationSession,
}

impl ArrivalDetector {
    pub fn new(threshold_meters: f64) -> Self {
        Self {
            threshold_meters,
            session: NavigationSession::default(),
        }
    }

    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    pub fn session(&self) -> NavigationSession {
        self.session
    }

    /// Start a session for a newly selected destination, clearing the latch.
    pub fn begin(&mut self) {
        self.session = NavigationSession {
            active: true,
            arrived: false,
        };
    }

    /// End the session. The latch is kept until the next [`begin`](Self::begin).
    pub fn end(&mut self) {
        self.session.active = false;
    }

    /// Compare an estimate against the destination.
    pub fn check(
        &mut self,
        estimate: &SmoothedEstimate,
        destination: &Destination,
    ) -> ArrivalStatus {
        if self.session.arrived {
            return ArrivalStatus::AlreadyArrived;
        }

        let distance = distance_meters(estimate.coordinate(), destination.coordinates);
        if distance < self.threshold_meters {
            self.session.arrived = true;
            tracing::info!(
                block = %destination.id.block,
                lot = %destination.id.lot,
                distance_m = format!("{:.1}", distance),
                "Arrived at destination"
            );
            ArrivalStatus::JustArrived
        } else {
            ArrivalStatus::EnRoute(distance)
        }
    }
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_THRESHOLD_METERS)
    }
}
