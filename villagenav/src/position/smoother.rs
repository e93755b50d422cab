//! Position smoother - recursive filter followed by a sliding-window average.
//!
//! Raw fixes jitter by several meters even when the device is still. The
//! smoother combines two techniques:
//!
//! 1. **Recursive filter** per axis. Each axis keeps an estimate `x` and an
//!    error covariance `p`. On a measurement `z` with declared accuracy `a`:
//!
//!    ```text
//!    p ← p + Q
//!    K = p / (p + R·a)
//!    x ← x + K·(z − x)
//!    p ← (1 − K)·p
//!    ```
//!
//!    The first sample initializes `x = z`, `p = 1`. Low-accuracy samples get
//!    a small gain, so a single wild fix is damped rather than ignored.
//!
//! 2. **Sliding window** of the filtered samples. The reported position is a
//!    weighted mean of the window (see [`WindowWeighting`]). The reported
//!    accuracy is the *worst* accuracy in the window: averaging would
//!    understate the uncertainty.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::sample::{PositionSample, SourceTag};
use crate::geo::Coordinate;

/// Smallest accuracy fed into the gain computation.
const MIN_ACCURACY_METERS: f64 = f64::EPSILON;

/// Floor for `Q` and `R`. At zero the covariance collapses and the gain
/// becomes 0/0.
const MIN_NOISE: f64 = 1e-9;

/// Default process noise `Q`.
pub const DEFAULT_PROCESS_NOISE: f64 = 0.05;

/// Default measurement noise scale `R`.
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 0.1;

/// Default window capacity.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// How samples in the window are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowWeighting {
    /// Every sample counts the same.
    Uniform,
    /// Linearly increasing weights, oldest 1 to newest n.
    #[default]
    Recency,
}

impl std::str::FromStr for WindowWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "recency" => Ok(Self::Recency),
            other => Err(format!("unknown weighting '{}'", other)),
        }
    }
}

impl std::fmt::Display for WindowWeighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Recency => write!(f, "recency"),
        }
    }
}

/// Smoother tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SmootherConfig {
    /// Process noise `Q`, added to the covariance every step.
    pub process_noise: f64,
    /// Measurement noise scale `R`, multiplied by the sample accuracy.
    pub measurement_noise: f64,
    /// Window capacity (at least 1).
    pub window_size: usize,
    /// Window weighting scheme.
    pub weighting: WindowWeighting,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            window_size: DEFAULT_WINDOW_SIZE,
            weighting: WindowWeighting::Recency,
        }
    }
}

/// Smoothed position estimate.
///
/// A snapshot of the smoother after an ingest. `longitude`/`latitude` are the
/// window mean; `filtered_*` is the recursive filter state before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedEstimate {
    pub longitude: f64,
    pub latitude: f64,
    /// Worst accuracy among windowed samples.
    pub accuracy_meters: f64,
    pub filtered_longitude: f64,
    pub filtered_latitude: f64,
    /// Accuracy declared by the most recent sample.
    pub last_accuracy_meters: f64,
    /// Heading of the most recent sample, if any.
    pub heading_degrees: Option<f64>,
    /// Speed of the most recent sample, if any.
    pub speed_mps: Option<f64>,
    /// Timestamp of the most recent sample.
    pub timestamp_millis: i64,
    /// Source of the most recent sample.
    pub source: SourceTag,
    /// Number of samples currently in the window.
    pub window_len: usize,
}

impl SmoothedEstimate {
    /// An estimate that is exactly one sample (no smoothing history).
    pub fn from_sample(sample: &PositionSample) -> Self {
        Self {
            longitude: sample.longitude,
            latitude: sample.latitude,
            accuracy_meters: sample.accuracy_meters,
            filtered_longitude: sample.longitude,
            filtered_latitude: sample.latitude,
            last_accuracy_meters: sample.accuracy_meters,
            heading_degrees: sample.heading_degrees,
            speed_mps: sample.speed_mps,
            timestamp_millis: sample.timestamp_millis,
            source: sample.source,
            window_len: 1,
        }
    }

    /// The estimated position as a coordinate.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

/// One-dimensional recursive estimator.
#[derive(Debug, Clone, Copy)]
struct AxisFilter {
    estimate: f64,
    covariance: f64,
}

impl AxisFilter {
    fn new(initial: f64) -> Self {
        Self {
            estimate: initial,
            covariance: 1.0,
        }
    }

    fn update(&mut self, measurement: f64, accuracy: f64, q: f64, r: f64) -> f64 {
        self.covariance += q;
        let gain = self.covariance / (self.covariance + r * accuracy);
        self.estimate += gain * (measurement - self.estimate);
        self.covariance *= 1.0 - gain;
        self.estimate
    }
}

/// Stateful position smoother for one tracking session.
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    config: SmootherConfig,
    longitude: Option<AxisFilter>,
    latitude: Option<AxisFilter>,
    window: VecDeque<PositionSample>,
    last: Option<SmoothedEstimate>,
}

impl PositionSmoother {
    /// Create a smoother. A window size of 0 is treated as 1; noise values
    /// that are not positive and finite are raised to a small floor.
    pub fn new(config: SmootherConfig) -> Self {
        let config = SmootherConfig {
            window_size: config.window_size.max(1),
            process_noise: clamp_noise(config.process_noise),
            measurement_noise: clamp_noise(config.measurement_noise),
            ..config
        };
        let capacity = config.window_size;
        Self {
            config,
            longitude: None,
            latitude: None,
            window: VecDeque::with_capacity(capacity),
            last: None,
        }
    }

    /// Create with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(SmootherConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Ingest a sample and return the updated estimate.
    pub fn ingest(&mut self, sample: &PositionSample) -> SmoothedEstimate {
        let accuracy = if sample.accuracy_meters > 0.0 {
            sample.accuracy_meters
        } else {
            MIN_ACCURACY_METERS
        };
        let (q, r) = (self.config.process_noise, self.config.measurement_noise);

        let filtered_longitude = match self.longitude.as_mut() {
            Some(axis) => axis.update(sample.longitude, accuracy, q, r),
            None => {
                self.longitude = Some(AxisFilter::new(sample.longitude));
                sample.longitude
            }
        };
        let filtered_latitude = match self.latitude.as_mut() {
            Some(axis) => axis.update(sample.latitude, accuracy, q, r),
            None => {
                self.latitude = Some(AxisFilter::new(sample.latitude));
                sample.latitude
            }
        };

        if self.window.len() == self.config.window_size {
            self.window.pop_front();
        }
        self.window.push_back(PositionSample {
            longitude: filtered_longitude,
            latitude: filtered_latitude,
            ..*sample
        });

        let (longitude, latitude) = self.window_mean();
        let accuracy_meters = self
            .window
            .iter()
            .map(|s| s.accuracy_meters)
            .fold(0.0, f64::max);

        let estimate = SmoothedEstimate {
            longitude,
            latitude,
            accuracy_meters,
            filtered_longitude,
            filtered_latitude,
            last_accuracy_meters: sample.accuracy_meters,
            heading_degrees: sample.heading_degrees,
            speed_mps: sample.speed_mps,
            timestamp_millis: sample.timestamp_millis,
            source: sample.source,
            window_len: self.window.len(),
        };
        self.last = Some(estimate);
        estimate
    }

    /// The latest estimate, if any sample has been ingested.
    pub fn estimate(&self) -> Option<SmoothedEstimate> {
        self.last
    }

    /// Forget all state; the next sample re-initializes the filter.
    pub fn reset(&mut self) {
        self.longitude = None;
        self.latitude = None;
        self.window.clear();
        self.last = None;
    }

    fn window_mean(&self) -> (f64, f64) {
        let mut total_weight = 0.0;
        let mut lon = 0.0;
        let mut lat = 0.0;

        for (i, s) in self.window.iter().enumerate() {
            let weight = match self.config.weighting {
                WindowWeighting::Uniform => 1.0,
                WindowWeighting::Recency => (i + 1) as f64,
            };
            total_weight += weight;
            lon += weight * s.longitude;
            lat += weight * s.latitude;
        }

        (lon / total_weight, lat / total_weight)
    }
}

impl Default for PositionSmoother {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn clamp_noise(value: f64) -> f64 {
    if value.is_finite() && value > MIN_NOISE {
        value
    } else {
        MIN_NOISE
    }
}
