//! Position samples and the adapter that produces them.
//!
//! This module defines the fundamental position types:
//!
//! - [`RawFix`] - A device location reading as delivered, every field optional
//! - [`SourceTag`] - Which acquisition path produced a sample
//! - [`PositionSample`] - A validated, immutable fix
//! - [`adapt`] - The single validation boundary between the two
//!
//! Everything downstream of [`adapt`] can rely on the sample invariants:
//! finite coordinates inside their ranges, non-negative accuracy, and a
//! heading/speed that is either absent or meaningful.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{is_valid_latitude, is_valid_longitude, normalize_heading, Coordinate};
use crate::time::epoch_millis_now;

/// Accuracy assigned when a fix does not declare one.
///
/// Unknown precision is treated as the worst case so the smoother weights the
/// sample accordingly.
pub const UNKNOWN_ACCURACY_METERS: f64 = 1000.0;

/// Source of a position sample.
///
/// Consumers use the tag to pick a marker style and to tell a real fix from
/// a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// High-accuracy acquisition (satellite fix).
    Precise,
    /// Low-power acquisition (network fix).
    Coarse,
    /// Projected forward by dead reckoning.
    Predicted,
    /// Configured fallback coordinate after acquisition failed.
    Default,
    /// Fixed debug position from configuration.
    Debug,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precise => write!(f, "precise"),
            Self::Coarse => write!(f, "coarse"),
            Self::Predicted => write!(f, "predicted"),
            Self::Default => write!(f, "default"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// A raw device location reading.
///
/// Mirrors what a platform location API hands over: every field may be
/// missing, and numeric fields may be NaN (browsers report a NaN heading when
/// the device is stationary).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Declared accuracy radius in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Ground speed in meters per second.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RawFix {
    /// A fix with coordinates and accuracy only.
    pub fn new(longitude: f64, latitude: f64, accuracy: f64) -> Self {
        Self {
            longitude: Some(longitude),
            latitude: Some(latitude),
            accuracy: Some(accuracy),
            ..Default::default()
        }
    }

    /// Set the timestamp (milliseconds since the Unix epoch).
    pub fn at(mut self, timestamp_millis: i64) -> Self {
        self.timestamp = Some(timestamp_millis);
        self
    }

    /// Set heading (degrees) and speed (m/s).
    pub fn moving(mut self, heading: f64, speed: f64) -> Self {
        self.heading = Some(heading);
        self.speed = Some(speed);
        self
    }
}

/// Errors raised when a raw fix cannot become a sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// Longitude or latitude is missing.
    #[error("Fix has no coordinates")]
    MissingCoordinates,

    /// Longitude or latitude is non-finite or outside its range.
    #[error("Fix coordinates out of range: lon={longitude}, lat={latitude}")]
    OutOfRange { longitude: f64, latitude: f64 },
}

/// A validated position sample.
///
/// Immutable once created. Invariants: longitude in [-180, 180], latitude in
/// [-90, 90], `accuracy_meters >= 0`, heading in [0, 360) when present,
/// speed `>= 0` when present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub longitude: f64,
    pub latitude: f64,
    pub accuracy_meters: f64,
    pub heading_degrees: Option<f64>,
    pub speed_mps: Option<f64>,
    pub timestamp_millis: i64,
    pub source: SourceTag,
}

impl PositionSample {
    /// Sample for the configured fallback coordinate.
    pub fn default_position(
        coordinate: Coordinate,
        accuracy_meters: f64,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            longitude: coordinate.longitude,
            latitude: coordinate.latitude,
            accuracy_meters,
            heading_degrees: None,
            speed_mps: None,
            timestamp_millis,
            source: SourceTag::Default,
        }
    }

    /// The sample position as a coordinate.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

/// Adapt a raw device fix into a [`PositionSample`].
///
/// The caller supplies the source tag, which depends on the acquisition mode
/// that produced the fix. A missing timestamp defaults to now.
pub fn adapt(raw: &RawFix, source: SourceTag) -> Result<PositionSample, AdapterError> {
    adapt_at(raw, source, epoch_millis_now())
}

/// Adapt with an explicit "now" used when the fix carries no timestamp.
pub fn adapt_at(
    raw: &RawFix,
    source: SourceTag,
    now_millis: i64,
) -> Result<PositionSample, AdapterError> {
    let (Some(longitude), Some(latitude)) = (raw.longitude, raw.latitude) else {
        return Err(AdapterError::MissingCoordinates);
    };

    if !is_valid_longitude(longitude) || !is_valid_latitude(latitude) {
        return Err(AdapterError::OutOfRange {
            longitude,
            latitude,
        });
    }

    let accuracy_meters = match raw.accuracy {
        Some(a) if a.is_finite() => a.max(0.0),
        _ => UNKNOWN_ACCURACY_METERS,
    };

    let heading_degrees = raw
        .heading
        .filter(|h| h.is_finite())
        .map(normalize_heading);

    let speed_mps = raw.speed.filter(|s| s.is_finite() && *s >= 0.0);

    Ok(PositionSample {
        longitude,
        latitude,
        accuracy_meters,
        heading_degrees,
        speed_mps,
        timestamp_millis: raw.timestamp.unwrap_or(now_millis),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_preserves_coordinates_exactly() {
        let raw = RawFix::new(120.95134859887523, 14.347872973134175, 8.0).at(1_000);
        let sample = adapt(&raw, SourceTag::Precise).unwrap();

        assert_eq!(sample.longitude.to_bits(), 120.95134859887523f64.to_bits());
        assert_eq!(sample.latitude.to_bits(), 14.347872973134175f64.to_bits());
        assert_eq!(sample.accuracy_meters, 8.0);
        assert_eq!(sample.timestamp_millis, 1_000);
        assert_eq!(sample.source, SourceTag::Precise);
    }

    #[test]
    fn test_adapt_does_not_mutate_input() {
        let raw = RawFix::new(1.0, 2.0, -3.0).moving(-90.0, 1.0);
        let before = raw.clone();
        let _ = adapt(&raw, SourceTag::Coarse).unwrap();
        assert_eq!(raw, before);
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let raw = RawFix::new(1.0, 2.0, 5.0);
        let sample = adapt_at(&raw, SourceTag::Coarse, 42_000).unwrap();
        assert_eq!(sample.timestamp_millis, 42_000);
    }

    #[test]
    fn test_missing_coordinates_fails() {
        let raw = RawFix {
            longitude: Some(1.0),
            ..Default::default()
        };
        assert_eq!(
            adapt(&raw, SourceTag::Precise),
            Err(AdapterError::MissingCoordinates)
        );
        assert_eq!(
            adapt(&RawFix::default(), SourceTag::Precise),
            Err(AdapterError::MissingCoordinates)
        );
    }

    #[test]
    fn test_out_of_range_fails() {
        let raw = RawFix::new(181.0, 0.0, 5.0);
        assert!(matches!(
            adapt(&raw, SourceTag::Precise),
            Err(AdapterError::OutOfRange { .. })
        ));

        let raw = RawFix::new(0.0, f64::NAN, 5.0);
        assert!(matches!(
            adapt(&raw, SourceTag::Precise),
            Err(AdapterError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_accuracy_normalization() {
        let negative = adapt(&RawFix::new(0.0, 0.0, -4.0), SourceTag::Precise).unwrap();
        assert_eq!(negative.accuracy_meters, 0.0);

        let missing = RawFix {
            longitude: Some(0.0),
            latitude: Some(0.0),
            ..Default::default()
        };
        let missing = adapt(&missing, SourceTag::Precise).unwrap();
        assert_eq!(missing.accuracy_meters, UNKNOWN_ACCURACY_METERS);

        let nan = adapt(&RawFix::new(0.0, 0.0, f64::NAN), SourceTag::Precise).unwrap();
        assert_eq!(nan.accuracy_meters, UNKNOWN_ACCURACY_METERS);
    }

    #[test]
    fn test_heading_and_speed_normalization() {
        let sample = adapt(
            &RawFix::new(0.0, 0.0, 5.0).moving(-90.0, 1.5),
            SourceTag::Precise,
        )
        .unwrap();
        assert_eq!(sample.heading_degrees, Some(270.0));
        assert_eq!(sample.speed_mps, Some(1.5));

        let due_north = adapt(
            &RawFix::new(0.0, 0.0, 5.0).moving(-1e-14, 1.0),
            SourceTag::Precise,
        )
        .unwrap();
        assert_eq!(due_north.heading_degrees, Some(0.0));

        let stationary = adapt(
            &RawFix::new(0.0, 0.0, 5.0).moving(f64::NAN, -1.0),
            SourceTag::Precise,
        )
        .unwrap();
        assert_eq!(stationary.heading_degrees, None);
        assert_eq!(stationary.speed_mps, None);
    }

    #[test]
    fn test_raw_fix_deserializes_with_missing_fields() {
        let raw: RawFix = serde_json::from_str(r#"{"longitude": 1.5, "latitude": 2.5}"#).unwrap();
        assert_eq!(raw.longitude, Some(1.5));
        assert_eq!(raw.accuracy, None);
        assert_eq!(raw.timestamp, None);
    }

    #[test]
    fn test_source_tag_display() {
        assert_eq!(SourceTag::Precise.to_string(), "precise");
        assert_eq!(SourceTag::Default.to_string(), "default");
    }
}
