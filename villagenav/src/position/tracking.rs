//! Live tracking session.
//!
//! A [`TrackingSession`] ties the pipeline together: it owns one spawned task
//! that opens device watches, feeds fixes and failures through the
//! [`AcquisitionScheduler`], smooths accepted samples and publishes the
//! resulting estimates.
//!
//! # Usage
//!
//! ```ignore
//! let session = TrackingSession::start(provider, Some(compass_rx), TrackingConfig::default());
//! let mut updates = session.subscribe();
//!
//! while let Ok(estimate) = updates.recv().await {
//!     render(session.predicted_estimate(epoch_millis_now()));
//! }
//!
//! session.stop();
//! ```
//!
//! # Design
//!
//! - Exactly one watch is open at a time; it is cancelled before the next one
//!   opens.
//! - A watch that stays silent past its mode timeout, or whose stream ends,
//!   counts as a failed acquisition.
//! - Estimates are published two ways: a snapshot readable at any time
//!   through [`PositionReader`], and a broadcast channel for push consumers.
//! - Dead reckoning is applied when reading, never fed back into the smoother.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::device::{
    AcquisitionError, AcquisitionMode, LocationProvider, WatchRequest, WatchSettings,
};
use super::heading::{spawn_heading_listener, HeadingCell};
use super::predictor::{DeadReckoning, PredictorConfig};
use super::sample::{PositionSample, RawFix, SourceTag};
use super::scheduler::{AcquisitionScheduler, FixOutcome, SchedulerConfig, SchedulerState};
use super::smoother::{PositionSmoother, SmoothedEstimate, SmootherConfig};
use crate::geo::Coordinate;
use crate::time::{elapsed_seconds, epoch_millis_now};

/// Accuracy reported for the fixed debug position.
pub const DEBUG_ACCURACY_METERS: f64 = 5.0;

/// Capacity of the estimate broadcast channel.
const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// Configuration for a tracking session.
#[derive(Debug, Clone, Default)]
pub struct TrackingConfig {
    pub scheduler: SchedulerConfig,
    pub smoother: SmootherConfig,
    pub predictor: PredictorConfig,
    pub watch: WatchSettings,
    /// When set, publish this fixed position and never open a watch.
    pub debug_position: Option<Coordinate>,
}

/// Snapshot of a session's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingStatus {
    pub state: SchedulerState,
    pub consecutive_failures: u32,
    pub default_emitted: bool,
    /// Fixes that reached the smoother.
    pub fixes_applied: u64,
    /// Fixes dropped as invalid or out of order.
    pub fixes_rejected: u64,
    /// Latest published estimate.
    pub estimate: Option<SmoothedEstimate>,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::HighAccuracy,
            consecutive_failures: 0,
            default_emitted: false,
            fixes_applied: 0,
            fixes_rejected: 0,
            estimate: None,
        }
    }
}

/// Cheap, cloneable read access to a session's position.
#[derive(Clone)]
pub struct PositionReader {
    status: Arc<RwLock<TrackingStatus>>,
    heading: HeadingCell,
    predictor: DeadReckoning,
}

impl PositionReader {
    /// Latest smoothed estimate, `None` before the first sample.
    pub fn current_estimate(&self) -> Option<SmoothedEstimate> {
        self.status.read().estimate
    }

    /// Latest estimate advanced by dead reckoning to `now_millis`.
    ///
    /// Uses the heading of the latest fix, or the compass heading when the
    /// fix has none.
    pub fn predicted_estimate(&self, now_millis: i64) -> Option<SmoothedEstimate> {
        let estimate = self.current_estimate()?;
        let heading = estimate.heading_degrees.or_else(|| self.heading.get());
        let elapsed = elapsed_seconds(estimate.timestamp_millis, now_millis);
        Some(
            self.predictor
                .advance(&estimate, heading, estimate.speed_mps, elapsed),
        )
    }

    pub fn status(&self) -> TrackingStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.status.read().state
    }

    /// Latest compass heading, if a heading stream is attached.
    pub fn compass_heading(&self) -> Option<f64> {
        self.heading.get()
    }
}

/// A running tracking session.
///
/// Dropping the session stops it.
pub struct TrackingSession {
    reader: PositionReader,
    updates: broadcast::Sender<SmoothedEstimate>,
    cancellation: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TrackingSession {
    /// Start tracking with `provider`.
    ///
    /// `heading_rx` is an optional compass stream (degrees). Must be called
    /// from within a Tokio runtime.
    pub fn start<P: LocationProvider>(
        provider: P,
        heading_rx: Option<mpsc::Receiver<f64>>,
        config: TrackingConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let cancellation = CancellationToken::new();
        let heading = HeadingCell::new();
        let reader = PositionReader {
            status: Arc::new(RwLock::new(TrackingStatus::default())),
            heading: heading.clone(),
            predictor: DeadReckoning::new(config.predictor.clone()),
        };

        if let Some(rx) = heading_rx {
            spawn_heading_listener(rx, heading, cancellation.child_token());
        }

        let session = Self {
            reader,
            updates,
            cancellation,
            task: Mutex::new(None),
        };

        if let Some(position) = config.debug_position {
            session.publish_debug_position(position);
            return session;
        }

        let runner = SessionRunner {
            provider,
            scheduler: AcquisitionScheduler::new(config.scheduler),
            smoother: PositionSmoother::new(config.smoother),
            watch_settings: config.watch,
            status: Arc::clone(&session.reader.status),
            updates: session.updates.clone(),
            cancellation: session.cancellation.clone(),
        };
        *session.task.lock() = Some(tokio::spawn(runner.run()));

        session
    }

    fn publish_debug_position(&self, position: Coordinate) {
        let sample = PositionSample {
            longitude: position.longitude,
            latitude: position.latitude,
            accuracy_meters: DEBUG_ACCURACY_METERS,
            heading_degrees: None,
            speed_mps: None,
            timestamp_millis: epoch_millis_now(),
            source: SourceTag::Debug,
        };
        let estimate = SmoothedEstimate::from_sample(&sample);
        self.reader.status.write().estimate = Some(estimate);
        let _ = self.updates.send(estimate);
        tracing::info!(
            longitude = position.longitude,
            latitude = position.latitude,
            "Tracking pinned to debug position"
        );
    }

    /// Read handle that outlives borrows of the session.
    pub fn reader(&self) -> PositionReader {
        self.reader.clone()
    }

    pub fn current_estimate(&self) -> Option<SmoothedEstimate> {
        self.reader.current_estimate()
    }

    pub fn predicted_estimate(&self, now_millis: i64) -> Option<SmoothedEstimate> {
        self.reader.predicted_estimate(now_millis)
    }

    pub fn status(&self) -> TrackingStatus {
        self.reader.status()
    }

    pub fn state(&self) -> SchedulerState {
        self.reader.state()
    }

    /// Subscribe to published estimates.
    pub fn subscribe(&self) -> broadcast::Receiver<SmoothedEstimate> {
        self.updates.subscribe()
    }

    /// Stop tracking. Cancels the active watch and any pending retry.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if !self.cancellation.is_cancelled() {
            tracing::debug!("Stopping tracking session");
            self.cancellation.cancel();
        }
        self.reader.status.write().state = SchedulerState::Stopped;
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait for the session task to finish. Returns immediately if it
    /// already has, or if no task was started.
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Tracking task ended abnormally");
            }
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// State owned by the session task.
struct SessionRunner<P> {
    provider: P,
    scheduler: AcquisitionScheduler,
    smoother: PositionSmoother,
    watch_settings: WatchSettings,
    status: Arc<RwLock<TrackingStatus>>,
    updates: broadcast::Sender<SmoothedEstimate>,
    cancellation: CancellationToken,
}

impl<P: LocationProvider> SessionRunner<P> {
    async fn run(mut self) {
        tracing::info!("Tracking session started");
        let mut mode = AcquisitionMode::HighAccuracy;

        'session: loop {
            let request = WatchRequest::for_mode(mode, &self.watch_settings);
            let mut watch = match self.provider.watch(request) {
                Ok(watch) => watch,
                Err(error) => match self.handle_failure(error).await {
                    Some(next) => {
                        mode = next;
                        continue 'session;
                    }
                    None => break 'session,
                },
            };
            tracing::debug!(
                mode = %mode,
                timeout_ms = request.timeout.as_millis() as u64,
                maximum_age_ms = request.maximum_age.as_millis() as u64,
                "Location watch opened"
            );

            loop {
                let event = tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => break 'session,
                    event = tokio::time::timeout(request.timeout, watch.next()) => event,
                };

                let event = match event {
                    Ok(Some(event)) => event,
                    Ok(None) => Err(AcquisitionError::PositionUnavailable),
                    Err(_) => Err(AcquisitionError::Timeout),
                };

                match event {
                    Ok(raw) => {
                        if let Some(next) = self.handle_fix(&raw) {
                            watch.cancel();
                            mode = next;
                            continue 'session;
                        }
                    }
                    Err(error) => {
                        watch.cancel();
                        match self.handle_failure(error).await {
                            Some(next) => {
                                mode = next;
                                continue 'session;
                            }
                            None => break 'session,
                        }
                    }
                }
            }
        }

        self.scheduler.stop();
        self.status.write().state = SchedulerState::Stopped;
        tracing::info!("Tracking session stopped");
    }

    /// Apply a fix. Returns the mode to switch to, if any.
    fn handle_fix(&mut self, raw: &RawFix) -> Option<AcquisitionMode> {
        match self.scheduler.on_fix(raw, epoch_millis_now()) {
            Ok(FixOutcome::Applied { sample, switch_to }) => {
                let estimate = self.smoother.ingest(&sample);
                tracing::trace!(
                    longitude = estimate.longitude,
                    latitude = estimate.latitude,
                    accuracy_m = estimate.accuracy_meters,
                    source = %estimate.source,
                    "Position estimate updated"
                );
                {
                    let mut status = self.status.write();
                    status.fixes_applied += 1;
                    status.estimate = Some(estimate);
                    self.sync_status(&mut status);
                }
                let _ = self.updates.send(estimate);
                switch_to
            }
            Ok(FixOutcome::Stale {
                timestamp_millis,
                last_applied_millis,
            }) => {
                tracing::debug!(
                    timestamp_millis,
                    last_applied_millis,
                    "Discarding out-of-order fix"
                );
                self.status.write().fixes_rejected += 1;
                None
            }
            Ok(FixOutcome::Ignored) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping invalid fix");
                self.status.write().fixes_rejected += 1;
                None
            }
        }
    }

    /// Apply a failure and wait out the retry delay.
    ///
    /// Returns the mode for the next watch, `None` when the session is
    /// stopping.
    async fn handle_failure(&mut self, error: AcquisitionError) -> Option<AcquisitionMode> {
        let outcome = self.scheduler.on_failure(error, epoch_millis_now())?;

        {
            let mut status = self.status.write();
            self.sync_status(&mut status);

            // Published even over an older real estimate, but never smoothed
            if let Some(default) = outcome.default_sample {
                let estimate = SmoothedEstimate::from_sample(&default);
                status.estimate = Some(estimate);
                let _ = self.updates.send(estimate);
            }
        }

        if !outcome.retry_delay.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => return None,
                _ = tokio::time::sleep(outcome.retry_delay) => {}
            }
        }

        Some(outcome.retry_mode)
    }

    fn sync_status(&self, status: &mut TrackingStatus) {
        if status.state != SchedulerState::Stopped {
            status.state = self.scheduler.state();
        }
        status.consecutive_failures = self.scheduler.consecutive_failures();
        status.default_emitted = self.scheduler.default_emitted();
    }
}
