//! Time-related utility functions.
//!
//! Position samples carry wall-clock timestamps in milliseconds since the Unix
//! epoch, the unit device location APIs report. These helpers convert between
//! that representation and `std::time` types.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Negative if the system clock is set before the epoch.
pub fn epoch_millis_now() -> i64 {
    system_time_to_epoch_millis(SystemTime::now())
}

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch map to negative values.
pub fn system_time_to_epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// Elapsed time between two epoch-millisecond timestamps, in seconds.
///
/// Returns 0.0 when `later` is not after `earlier` (clock skew or reordering).
pub fn elapsed_seconds(earlier_millis: i64, later_millis: i64) -> f64 {
    let delta = later_millis.saturating_sub(earlier_millis);
    if delta <= 0 {
        0.0
    } else {
        Duration::from_millis(delta as u64).as_secs_f64()
    }
}
