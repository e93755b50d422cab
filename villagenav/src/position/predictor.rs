//! Dead-reckoning predictor.
//!
//! Between fixes the marker would otherwise sit still and then jump. The
//! predictor projects the smoothed estimate forward along the current heading
//! at the current speed, so the marker keeps moving at walking pace.
//!
//! Prediction is a pure function of its inputs. It is applied to the
//! smoother's output when a consumer reads the position; predicted positions
//! are never fed back into the smoother.

use super::sample::SourceTag;
use super::smoother::SmoothedEstimate;
use crate::geo::offset_meters;

/// Default speed below which motion is treated as sensor noise (m/s).
pub const DEFAULT_MIN_SPEED_MPS: f64 = 0.3;

/// Default cap on how far ahead of the last fix a prediction may reach.
pub const DEFAULT_MAX_HORIZON_SECS: f64 = 5.0;

/// Predictor tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    /// Whether prediction is applied at all.
    pub enabled: bool,
    /// Noise floor for speed (m/s). At or below it the estimate passes through.
    pub min_speed_mps: f64,
    /// Maximum elapsed time used for projection (seconds).
    pub max_horizon_secs: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_speed_mps: DEFAULT_MIN_SPEED_MPS,
            max_horizon_secs: DEFAULT_MAX_HORIZON_SECS,
        }
    }
}

/// Dead-reckoning predictor.
#[derive(Debug, Clone, Default)]
pub struct DeadReckoning {
    config: PredictorConfig,
}

impl DeadReckoning {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Advance an estimate along `heading_degrees` at `speed_mps` for
    /// `elapsed_seconds`.
    ///
    /// Returns the estimate unchanged unless prediction is enabled, both
    /// heading and speed are present, the speed exceeds the noise floor and
    /// the elapsed time is positive. Elapsed time is capped at the configured
    /// horizon.
    pub fn advance(
        &self,
        estimate: &SmoothedEstimate,
        heading_degrees: Option<f64>,
        speed_mps: Option<f64>,
        elapsed_seconds: f64,
    ) -> SmoothedEstimate {
        if !self.config.enabled {
            return *estimate;
        }

        let (Some(heading), Some(speed)) = (heading_degrees, speed_mps) else {
            return *estimate;
        };

        if !heading.is_finite()
            || !speed.is_finite()
            || speed <= self.config.min_speed_mps
            || !(elapsed_seconds > 0.0)
        {
            return *estimate;
        }

        let elapsed = elapsed_seconds.min(self.config.max_horizon_secs);
        let distance = speed * elapsed;
        let heading_rad = heading.to_radians();
        let east = distance * heading_rad.sin();
        let north = distance * heading_rad.cos();

        match offset_meters(estimate.coordinate(), east, north) {
            Some(moved) => SmoothedEstimate {
                longitude: moved.longitude,
                latitude: moved.latitude,
                source: SourceTag::Predicted,
                ..*estimate
            },
            None => *estimate,
        }
    }
}
