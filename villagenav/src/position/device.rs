//! Device location provider interface.
//!
//! A [`LocationProvider`] opens watches on the device's location service. A
//! watch is a cancellable stream of raw fixes or acquisition errors, one per
//! [`WatchRequest`]. The tracking session owns at most one watch at a time and
//! cancels it before opening the next.
//!
//! # Usage
//!
//! ```ignore
//! let provider = ScriptedLocationProvider::new(events);
//! let request = WatchRequest::for_mode(AcquisitionMode::HighAccuracy, &settings);
//! let mut watch = provider.watch(request)?;
//! while let Some(event) = watch.next().await {
//!     // Ok(RawFix) or Err(AcquisitionError)
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::sample::{RawFix, SourceTag};

/// Default high-accuracy watch timeout.
pub const DEFAULT_HIGH_ACCURACY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default low-power watch timeout.
pub const DEFAULT_LOW_POWER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum age of a cached fix in low-power mode.
pub const DEFAULT_LOW_POWER_MAXIMUM_AGE: Duration = Duration::from_secs(60);

/// Capacity of the channel behind a [`FixWatch`].
const WATCH_CHANNEL_CAPACITY: usize = 16;

/// Acquisition mode requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Satellite fix, high power draw.
    HighAccuracy,
    /// Network fix, cached fixes allowed.
    LowPower,
}

impl AcquisitionMode {
    /// Source tag for samples produced in this mode.
    pub fn source_tag(self) -> SourceTag {
        match self {
            Self::HighAccuracy => SourceTag::Precise,
            Self::LowPower => SourceTag::Coarse,
        }
    }
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighAccuracy => write!(f, "high_accuracy"),
            Self::LowPower => write!(f, "low_power"),
        }
    }
}

/// Errors reported by a location watch.
///
/// None of these are fatal; the scheduler falls back to the next mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionError {
    /// The user or platform refused location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No fix arrived within the watch timeout.
    #[error("Location request timed out")]
    Timeout,

    /// The platform could not determine a position.
    #[error("Position unavailable")]
    PositionUnavailable,
}

/// Per-mode watch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    pub high_accuracy_timeout: Duration,
    pub low_power_timeout: Duration,
    pub low_power_maximum_age: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            high_accuracy_timeout: DEFAULT_HIGH_ACCURACY_TIMEOUT,
            low_power_timeout: DEFAULT_LOW_POWER_TIMEOUT,
            low_power_maximum_age: DEFAULT_LOW_POWER_MAXIMUM_AGE,
        }
    }
}

/// Parameters for opening a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchRequest {
    pub mode: AcquisitionMode,
    /// Time allowed between fixes before the watch counts as failed.
    pub timeout: Duration,
    /// Oldest cached fix the device may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
}

impl WatchRequest {
    /// Build the request for a mode from the configured settings.
    pub fn for_mode(mode: AcquisitionMode, settings: &WatchSettings) -> Self {
        match mode {
            AcquisitionMode::HighAccuracy => Self {
                mode,
                timeout: settings.high_accuracy_timeout,
                maximum_age: Duration::ZERO,
            },
            AcquisitionMode::LowPower => Self {
                mode,
                timeout: settings.low_power_timeout,
                maximum_age: settings.low_power_maximum_age,
            },
        }
    }
}

/// Item delivered by a watch.
pub type WatchEvent = Result<RawFix, AcquisitionError>;

/// Receiving end of a location watch.
///
/// Cancelling the watch (explicitly or by dropping it) stops the producer.
pub struct FixWatch {
    receiver: mpsc::Receiver<WatchEvent>,
    cancellation: CancellationToken,
}

impl FixWatch {
    /// Create a connected feed/watch pair.
    pub fn channel() -> (WatchFeed, FixWatch) {
        let (sender, receiver) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let cancellation = CancellationToken::new();
        (
            WatchFeed {
                sender,
                cancellation: cancellation.clone(),
            },
            FixWatch {
                receiver,
                cancellation,
            },
        )
    }

    /// Next event, or `None` once the watch is cancelled or the feed closed.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => None,
            event = self.receiver.recv() => event,
        }
    }

    /// Cancel the watch. Idempotent.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Drop for FixWatch {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Producing end of a location watch, held by provider implementations.
#[derive(Clone)]
pub struct WatchFeed {
    sender: mpsc::Sender<WatchEvent>,
    cancellation: CancellationToken,
}

impl WatchFeed {
    /// Deliver an event. Returns false once the watch is gone.
    pub async fn send(&self, event: WatchEvent) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => false,
            sent = self.sender.send(event) => sent.is_ok(),
        }
    }

    /// Resolves when the consumer cancels or drops the watch.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled() || self.sender.is_closed()
    }
}

/// Source of device location watches.
pub trait LocationProvider: Send + Sync + 'static {
    /// Open a watch. An error here is a failed acquisition attempt.
    fn watch(&self, request: WatchRequest) -> Result<FixWatch, AcquisitionError>;
}

/// One step of a scripted location feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedEvent {
    /// Deliver a fix.
    Fix(RawFix),
    /// Deliver an acquisition error.
    Error(AcquisitionError),
    /// Deliver nothing for this many milliseconds.
    Pause(u64),
}

struct ScriptState {
    events: VecDeque<ScriptedEvent>,
    requests: Vec<WatchRequest>,
}

/// Location provider that replays a prepared list of events.
///
/// Events are shared across watches: a new watch continues where the
/// previous one stopped. Once the script is exhausted, watches stay open
/// and silent, so the consumer's timeout decides what happens next.
#[derive(Clone)]
pub struct ScriptedLocationProvider {
    state: Arc<Mutex<ScriptState>>,
    interval: Duration,
    exhausted: CancellationToken,
}

impl ScriptedLocationProvider {
    /// Replay `events` one second apart.
    pub fn new(events: impl IntoIterator<Item = ScriptedEvent>) -> Self {
        let events: VecDeque<ScriptedEvent> = events.into_iter().collect();
        let exhausted = CancellationToken::new();
        if events.is_empty() {
            exhausted.cancel();
        }
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                events,
                requests: Vec::new(),
            })),
            interval: Duration::from_secs(1),
            exhausted,
        }
    }

    /// Set the delay before each event.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Parse a JSON array of events.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let events: Vec<ScriptedEvent> = serde_json::from_str(json)?;
        Ok(Self::new(events))
    }

    /// Watch requests received so far, oldest first.
    pub fn requests(&self) -> Vec<WatchRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Token cancelled once the last event has been delivered.
    pub fn exhausted(&self) -> CancellationToken {
        self.exhausted.clone()
    }

    fn next_event(&self) -> Option<ScriptedEvent> {
        let mut state = self.state.lock();
        let event = state.events.pop_front();
        if state.events.is_empty() {
            self.exhausted.cancel();
        }
        event
    }

    async fn replay(self, feed: WatchFeed) {
        loop {
            tokio::select! {
                biased;
                _ = feed.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }

            // Re-check after the delay: a cancelled watch must not consume
            // an event meant for its successor.
            if feed.is_cancelled() {
                return;
            }

            let Some(event) = self.next_event() else {
                feed.cancelled().await;
                return;
            };

            let delivered = match event {
                ScriptedEvent::Fix(raw) => feed.send(Ok(raw)).await,
                ScriptedEvent::Error(error) => feed.send(Err(error)).await,
                ScriptedEvent::Pause(millis) => {
                    tokio::select! {
                        biased;
                        _ = feed.cancelled() => false,
                        _ = tokio::time::sleep(Duration::from_millis(millis)) => true,
                    }
                }
            };

            if !delivered {
                return;
            }
        }
    }
}

impl LocationProvider for ScriptedLocationProvider {
    fn watch(&self, request: WatchRequest) -> Result<FixWatch, AcquisitionError> {
        self.state.lock().requests.push(request);
        tracing::debug!(mode = %request.mode, "Scripted watch opened");

        let (feed, watch) = FixWatch::channel();
        tokio::spawn(self.clone().replay(feed));
        Ok(watch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_request_for_mode() {
        let settings = WatchSettings::default();

        let high = WatchRequest::for_mode(AcquisitionMode::HighAccuracy, &settings);
        assert_eq!(high.timeout, Duration::from_secs(10));
        assert_eq!(high.maximum_age, Duration::ZERO);

        let low = WatchRequest::for_mode(AcquisitionMode::LowPower, &settings);
        assert_eq!(low.timeout, Duration::from_secs(5));
        assert_eq!(low.maximum_age, Duration::from_secs(60));
    }

    #[test]
    fn test_mode_source_tags() {
        assert_eq!(AcquisitionMode::HighAccuracy.source_tag(), SourceTag::Precise);
        assert_eq!(AcquisitionMode::LowPower.source_tag(), SourceTag::Coarse);
    }

    #[test]
    fn test_scripted_events_from_json() {
        let provider = ScriptedLocationProvider::from_json(
            r#"[
                {"fix": {"longitude": 120.95, "latitude": 14.34, "accuracy": 12.0}},
                {"error": "timeout"},
                {"pause": 500}
            ]"#,
        )
        .unwrap();
        assert_eq!(provider.remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_watch_replays_in_order() {
        let provider = ScriptedLocationProvider::new(vec![
            ScriptedEvent::Fix(RawFix::new(1.0, 2.0, 5.0)),
            ScriptedEvent::Error(AcquisitionError::PositionUnavailable),
        ]);
        let settings = WatchSettings::default();
        let mut watch = provider
            .watch(WatchRequest::for_mode(AcquisitionMode::HighAccuracy, &settings))
            .unwrap();

        assert_eq!(watch.next().await, Some(Ok(RawFix::new(1.0, 2.0, 5.0))));
        assert_eq!(
            watch.next().await,
            Some(Err(AcquisitionError::PositionUnavailable))
        );
        assert!(provider.exhausted().is_cancelled());
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_watch_yields_none() {
        let provider = ScriptedLocationProvider::new(vec![ScriptedEvent::Fix(RawFix::new(
            1.0, 2.0, 5.0,
        ))]);
        let settings = WatchSettings::default();
        let mut watch = provider
            .watch(WatchRequest::for_mode(AcquisitionMode::LowPower, &settings))
            .unwrap();

        watch.cancel();
        assert!(watch.is_cancelled());
        assert_eq!(watch.next().await, None);

        // The cancelled watch did not consume the event
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_watch_continues_script() {
        let provider = ScriptedLocationProvider::new(vec![
            ScriptedEvent::Fix(RawFix::new(1.0, 1.0, 5.0)),
            ScriptedEvent::Fix(RawFix::new(2.0, 2.0, 5.0)),
        ]);
        let settings = WatchSettings::default();

        let mut first = provider
            .watch(WatchRequest::for_mode(AcquisitionMode::HighAccuracy, &settings))
            .unwrap();
        assert_eq!(first.next().await, Some(Ok(RawFix::new(1.0, 1.0, 5.0))));
        drop(first);

        let mut second = provider
            .watch(WatchRequest::for_mode(AcquisitionMode::LowPower, &settings))
            .unwrap();
        assert_eq!(second.next().await, Some(Ok(RawFix::new(2.0, 2.0, 5.0))));

        let modes: Vec<_> = provider.requests().iter().map(|r| r.mode).collect();
        assert_eq!(
            modes,
            vec![AcquisitionMode::HighAccuracy, AcquisitionMode::LowPower]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_watch_stays_silent() {
        let provider = ScriptedLocationProvider::new(Vec::new());
        let settings = WatchSettings::default();
        let mut watch = provider
            .watch(WatchRequest::for_mode(AcquisitionMode::LowPower, &settings))
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(30), watch.next()).await;
        assert!(result.is_err(), "exhausted watch should not yield");
    }
}
