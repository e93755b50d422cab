//! Acquisition scheduler state machine.
//!
//! Decides which acquisition mode the tracking session should run in, based
//! on the fixes and failures it observes:
//!
//! ```text
//!   HighAccuracy ──(precise fix or failure)──> LowPower ──(stop)──> Stopped
//!        │                                                             ^
//!        └─────────────────────────(stop)──────────────────────────────┘
//! ```
//!
//! There is no automatic return from `LowPower` to `HighAccuracy`. The first
//! failure seen in `LowPower` produces the configured default position, once
//! per session; later failures only schedule retries with capped exponential
//! backoff.
//!
//! The scheduler is synchronous and owns no I/O. The tracking session feeds
//! it events and acts on the outcomes (opening watches, sleeping, publishing).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::device::{AcquisitionError, AcquisitionMode};
use super::sample::{adapt_at, AdapterError, PositionSample, RawFix, UNKNOWN_ACCURACY_METERS};
use crate::geo::Coordinate;

/// Fixes more accurate than this (meters) end high-accuracy acquisition.
pub const DEFAULT_PRECISION_THRESHOLD_METERS: f64 = 15.0;

/// Fallback coordinate used when no fix can be acquired.
pub const DEFAULT_FALLBACK_POSITION: Coordinate =
    Coordinate::new(120.95134859887523, 14.347872973134175);

/// First retry delay after a low-power failure.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the low-power retry delay.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub precision_threshold_meters: f64,
    pub default_position: Coordinate,
    pub default_accuracy_meters: f64,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            precision_threshold_meters: DEFAULT_PRECISION_THRESHOLD_METERS,
            default_position: DEFAULT_FALLBACK_POSITION,
            default_accuracy_meters: UNKNOWN_ACCURACY_METERS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    HighAccuracy,
    LowPower,
    Stopped,
}

impl SchedulerState {
    /// Acquisition mode for this state, `None` when stopped.
    pub fn mode(self) -> Option<AcquisitionMode> {
        match self {
            Self::HighAccuracy => Some(AcquisitionMode::HighAccuracy),
            Self::LowPower => Some(AcquisitionMode::LowPower),
            Self::Stopped => None,
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighAccuracy => write!(f, "high_accuracy"),
            Self::LowPower => write!(f, "low_power"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Result of feeding a fix to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// The sample should be fed to the smoother. When `switch_to` is set the
    /// current watch must be replaced by one in that mode.
    Applied {
        sample: PositionSample,
        switch_to: Option<AcquisitionMode>,
    },
    /// The fix is older than the last applied one and must be discarded.
    Stale {
        timestamp_millis: i64,
        last_applied_millis: i64,
    },
    /// The scheduler is stopped.
    Ignored,
}

/// What to do after an acquisition failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureOutcome {
    /// Mode of the next watch.
    pub retry_mode: AcquisitionMode,
    /// Delay before opening it.
    pub retry_delay: Duration,
    /// Fallback sample to publish, produced at most once per session.
    pub default_sample: Option<PositionSample>,
}

/// Acquisition mode state machine.
#[derive(Debug, Clone)]
pub struct AcquisitionScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    consecutive_failures: u32,
    low_power_failures: u32,
    default_emitted: bool,
    last_applied_millis: Option<i64>,
}

impl AcquisitionScheduler {
    /// Create a scheduler in `HighAccuracy`.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::HighAccuracy,
            consecutive_failures: 0,
            low_power_failures: 0,
            default_emitted: false,
            last_applied_millis: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the default sample has been produced this session.
    pub fn default_emitted(&self) -> bool {
        self.default_emitted
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Handle a raw fix from the active watch.
    ///
    /// Returns an [`AdapterError`] when the fix is unusable; the scheduler
    /// state is unchanged in that case.
    pub fn on_fix(&mut self, raw: &RawFix, now_millis: i64) -> Result<FixOutcome, AdapterError> {
        let Some(mode) = self.state.mode() else {
            return Ok(FixOutcome::Ignored);
        };

        let sample = adapt_at(raw, mode.source_tag(), now_millis)?;

        if let Some(last) = self.last_applied_millis {
            if sample.timestamp_millis < last {
                return Ok(FixOutcome::Stale {
                    timestamp_millis: sample.timestamp_millis,
                    last_applied_millis: last,
                });
            }
        }

        self.last_applied_millis = Some(sample.timestamp_millis);
        self.consecutive_failures = 0;
        self.low_power_failures = 0;

        let switch_to = if mode == AcquisitionMode::HighAccuracy
            && sample.accuracy_meters < self.config.precision_threshold_meters
        {
            self.state = SchedulerState::LowPower;
            tracing::info!(
                accuracy_meters = sample.accuracy_meters,
                threshold_meters = self.config.precision_threshold_meters,
                "Precise fix acquired, switching to low-power acquisition"
            );
            Some(AcquisitionMode::LowPower)
        } else {
            None
        };

        Ok(FixOutcome::Applied { sample, switch_to })
    }

    /// Handle a failed acquisition attempt.
    ///
    /// Returns `None` when stopped.
    pub fn on_failure(
        &mut self,
        error: AcquisitionError,
        now_millis: i64,
    ) -> Option<FailureOutcome> {
        match self.state {
            SchedulerState::Stopped => None,
            SchedulerState::HighAccuracy => {
                self.consecutive_failures += 1;
                self.state = SchedulerState::LowPower;
                tracing::info!(
                    error = %error,
                    "High-accuracy acquisition failed, falling back to low power"
                );
                Some(FailureOutcome {
                    retry_mode: AcquisitionMode::LowPower,
                    retry_delay: Duration::ZERO,
                    default_sample: None,
                })
            }
            SchedulerState::LowPower => {
                self.consecutive_failures += 1;
                self.low_power_failures += 1;

                let default_sample = if self.default_emitted {
                    None
                } else {
                    self.default_emitted = true;
                    tracing::warn!(
                        error = %error,
                        longitude = self.config.default_position.longitude,
                        latitude = self.config.default_position.latitude,
                        "Low-power acquisition failed, using default position"
                    );
                    Some(PositionSample::default_position(
                        self.config.default_position,
                        self.config.default_accuracy_meters,
                        now_millis,
                    ))
                };

                let retry_delay = calculate_backoff(
                    self.low_power_failures,
                    self.config.retry_base_delay,
                    self.config.retry_max_delay,
                );
                tracing::debug!(
                    error = %error,
                    consecutive_failures = self.consecutive_failures,
                    retry_delay_ms = retry_delay.as_millis() as u64,
                    "Low-power acquisition failed, retrying"
                );

                Some(FailureOutcome {
                    retry_mode: AcquisitionMode::LowPower,
                    retry_delay,
                    default_sample,
                })
            }
        }
    }

    /// Enter `Stopped`. Idempotent.
    pub fn stop(&mut self) {
        if self.state != SchedulerState::Stopped {
            tracing::debug!(from = %self.state, "Acquisition scheduler stopped");
            self.state = SchedulerState::Stopped;
        }
    }
}

/// Capped exponential backoff: `base * 2^(n-1)`, at most `max`.
fn calculate_backoff(failures: u32, base: Duration, max: Duration) -> Duration {
    let exponent = failures.saturating_sub(1).min(20);
    base.saturating_mul(2u32.saturating_pow(exponent)).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::sample::SourceTag;

    fn fix(accuracy: f64, ts: i64) -> RawFix {
        RawFix::new(120.9513, 14.3478, accuracy).at(ts)
    }

    #[test]
    fn test_starts_in_high_accuracy() {
        let scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.state(), SchedulerState::HighAccuracy);
        assert_eq!(scheduler.consecutive_failures(), 0);
        assert!(!scheduler.default_emitted());
    }

    #[test]
    fn test_precise_fix_switches_to_low_power() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());

        let first = scheduler.on_fix(&fix(20.0, 1_000), 0).unwrap();
        match first {
            FixOutcome::Applied { sample, switch_to } => {
                assert_eq!(sample.source, SourceTag::Precise);
                assert_eq!(switch_to, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(scheduler.state(), SchedulerState::HighAccuracy);

        let second = scheduler.on_fix(&fix(10.0, 2_000), 0).unwrap();
        assert!(matches!(
            second,
            FixOutcome::Applied {
                switch_to: Some(AcquisitionMode::LowPower),
                ..
            }
        ));
        assert_eq!(scheduler.state(), SchedulerState::LowPower);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        scheduler.on_fix(&fix(15.0, 1_000), 0).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::HighAccuracy);
    }

    #[test]
    fn test_low_power_fixes_are_coarse_and_stay() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        scheduler.on_fix(&fix(5.0, 1_000), 0).unwrap();

        let outcome = scheduler.on_fix(&fix(3.0, 2_000), 0).unwrap();
        match outcome {
            FixOutcome::Applied { sample, switch_to } => {
                assert_eq!(sample.source, SourceTag::Coarse);
                assert_eq!(switch_to, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(scheduler.state(), SchedulerState::LowPower);
    }

    #[test]
    fn test_two_failures_emit_exactly_one_default() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());

        let first = scheduler
            .on_failure(AcquisitionError::Timeout, 5_000)
            .unwrap();
        assert_eq!(first.retry_mode, AcquisitionMode::LowPower);
        assert_eq!(first.retry_delay, Duration::ZERO);
        assert!(first.default_sample.is_none());
        assert_eq!(scheduler.state(), SchedulerState::LowPower);

        let second = scheduler
            .on_failure(AcquisitionError::Timeout, 6_000)
            .unwrap();
        let default = second.default_sample.expect("default sample");
        assert_eq!(default.source, SourceTag::Default);
        assert_eq!(default.coordinate(), DEFAULT_FALLBACK_POSITION);
        assert_eq!(default.accuracy_meters, UNKNOWN_ACCURACY_METERS);
        assert_eq!(default.timestamp_millis, 6_000);

        let third = scheduler
            .on_failure(AcquisitionError::PositionUnavailable, 7_000)
            .unwrap();
        assert!(third.default_sample.is_none());
        assert_eq!(scheduler.consecutive_failures(), 3);
    }

    #[test]
    fn test_default_latch_survives_recovery() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        scheduler.on_failure(AcquisitionError::PermissionDenied, 0);
        assert!(scheduler
            .on_failure(AcquisitionError::Timeout, 0)
            .unwrap()
            .default_sample
            .is_some());

        scheduler.on_fix(&fix(40.0, 1_000), 0).unwrap();
        assert_eq!(scheduler.consecutive_failures(), 0);

        let again = scheduler.on_failure(AcquisitionError::Timeout, 0).unwrap();
        assert!(again.default_sample.is_none());
    }

    #[test]
    fn test_low_power_backoff_is_capped() {
        let config = SchedulerConfig {
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(8),
            ..Default::default()
        };
        let mut scheduler = AcquisitionScheduler::new(config);
        scheduler.on_failure(AcquisitionError::Timeout, 0);

        let delays: Vec<Duration> = (0..6)
            .map(|_| {
                scheduler
                    .on_failure(AcquisitionError::Timeout, 0)
                    .unwrap()
                    .retry_delay
            })
            .collect();
        let secs: Vec<u64> = delays.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_stale_fix_is_discarded() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        scheduler.on_fix(&fix(30.0, 5_000), 0).unwrap();

        let outcome = scheduler.on_fix(&fix(30.0, 4_000), 0).unwrap();
        assert_eq!(
            outcome,
            FixOutcome::Stale {
                timestamp_millis: 4_000,
                last_applied_millis: 5_000,
            }
        );

        // Equal timestamps are still applied
        assert!(matches!(
            scheduler.on_fix(&fix(30.0, 5_000), 0).unwrap(),
            FixOutcome::Applied { .. }
        ));
    }

    #[test]
    fn test_invalid_fix_leaves_state_unchanged() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        let err = scheduler.on_fix(&RawFix::default(), 0).unwrap_err();
        assert_eq!(err, AdapterError::MissingCoordinates);
        assert_eq!(scheduler.state(), SchedulerState::HighAccuracy);
    }

    #[test]
    fn test_stopped_ignores_events() {
        let mut scheduler = AcquisitionScheduler::new(SchedulerConfig::default());
        scheduler.stop();
        scheduler.stop();

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.on_fix(&fix(5.0, 1_000), 0).unwrap(), FixOutcome::Ignored);
        assert!(scheduler.on_failure(AcquisitionError::Timeout, 0).is_none());
        assert!(!scheduler.default_emitted());
    }

    #[test]
    fn test_calculate_backoff() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(60);
        assert_eq!(calculate_backoff(1, base, max), Duration::from_millis(500));
        assert_eq!(calculate_backoff(2, base, max), Duration::from_secs(1));
        assert_eq!(calculate_backoff(4, base, max), Duration::from_secs(4));
        assert_eq!(calculate_backoff(30, base, max), max);
    }
}
