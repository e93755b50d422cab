//! Periodic position logging daemon.
//!
//! Logs the tracked position at a fixed interval, useful for reviewing a walk
//! afterwards and for diagnosing acquisition problems in the field.
//!
//! # Usage
//!
//! ```ignore
//! use villagenav::position::spawn_position_logger;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancellation = CancellationToken::new();
//! let handle = spawn_position_logger(
//!     session.reader(),
//!     cancellation.clone(),
//!     std::time::Duration::from_secs(10),
//! );
//! ```
//!
//! # Output Format
//!
//! Logs are emitted at DEBUG level with structured fields:
//! - `lat`, `lon` - Smoothed position in decimal degrees
//! - `accuracy_m` - Worst accuracy in the smoothing window
//! - `source` - Source tag of the estimate
//! - `state` - Acquisition state
//! - `failures` - Consecutive acquisition failures

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::tracking::PositionReader;

/// Default logging interval.
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Spawns a background task that periodically logs the tracked position.
///
/// The caller should check if DEBUG logging is enabled before spawning:
///
/// ```ignore
/// if tracing::enabled!(tracing::Level::DEBUG) {
///     spawn_position_logger(reader, cancel, DEFAULT_LOG_INTERVAL);
/// }
/// ```
pub fn spawn_position_logger(
    reader: PositionReader,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_position(&reader);
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Position logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_position(reader: &PositionReader) {
    let status = reader.status();

    if let Some(estimate) = status.estimate {
        tracing::debug!(
            lat = format!("{:.6}", estimate.latitude),
            lon = format!("{:.6}", estimate.longitude),
            accuracy_m = format!("{:.0}", estimate.accuracy_meters),
            source = %estimate.source,
            state = %status.state,
            failures = status.consecutive_failures,
            "Position update"
        );
    } else {
        tracing::debug!(
            state = %status.state,
            failures = status.consecutive_failures,
            "Position update (no position yet)"
        );
    }
}
