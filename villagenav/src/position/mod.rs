//! Live position pipeline.
//!
//! Turns a noisy, intermittent device location feed into a steady position
//! estimate suitable for drawing a "you are here" marker and for detecting
//! arrival.
//!
//! # Architecture
//!
//! ```text
//!   LocationProvider ──RawFix──> AcquisitionScheduler ──PositionSample──> PositionSmoother
//!         ^                           │ (adapt, mode switch,                     │
//!         │                           │  default position)                       v
//!         └────── open/cancel watch ──┘                               SmoothedEstimate
//!                                                                            │
//!                                 compass heading ──> DeadReckoning <────────┘ (on read)
//! ```
//!
//! Acquisition starts in high accuracy and drops to low power as soon as one
//! fix is precise enough, or as soon as high accuracy fails. Failures never
//! end tracking: the scheduler falls back, publishes the configured default
//! position once, and keeps retrying.
//!
//! # Usage
//!
//! ```ignore
//! use villagenav::position::{TrackingConfig, TrackingSession};
//!
//! let session = TrackingSession::start(provider, None, TrackingConfig::default());
//!
//! let mut rx = session.subscribe();
//! while let Ok(estimate) = rx.recv().await {
//!     println!("{} ({} m, {})", estimate.coordinate(), estimate.accuracy_meters, estimate.source);
//! }
//! ```
//!
//! # Components
//!
//! - [`sample`] - `RawFix`, `PositionSample`, `SourceTag` and the `adapt` boundary
//! - [`smoother`] - Recursive filter plus sliding window
//! - [`predictor`] - Dead reckoning between fixes
//! - [`scheduler`] - Acquisition mode state machine
//! - [`device`] - `LocationProvider` interface and the scripted provider
//! - [`heading`] - Compass heading listener
//! - [`tracking`] - `TrackingSession`, the task that runs it all

pub mod device;
pub mod heading;
mod logger;
pub mod predictor;
pub mod sample;
pub mod scheduler;
pub mod smoother;
pub mod tracking;

pub use device::{
    AcquisitionError, AcquisitionMode, FixWatch, LocationProvider, ScriptedEvent,
    ScriptedLocationProvider, WatchEvent, WatchFeed, WatchRequest, WatchSettings,
};
pub use heading::{spawn_heading_listener, HeadingCell};
pub use logger::{spawn_position_logger, DEFAULT_LOG_INTERVAL};
pub use predictor::{DeadReckoning, PredictorConfig};
pub use sample::{adapt, adapt_at, AdapterError, PositionSample, RawFix, SourceTag};
pub use scheduler::{
    AcquisitionScheduler, FailureOutcome, FixOutcome, SchedulerConfig, SchedulerState,
};
pub use smoother::{PositionSmoother, SmoothedEstimate, SmootherConfig, WindowWeighting};
pub use tracking::{PositionReader, TrackingConfig, TrackingSession, TrackingStatus};
