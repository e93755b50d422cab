//! Default values and constants for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants that have no home in a runtime module,
//! and the `ConfigFile::default()` implementation. Runtime defaults are
//! taken from the modules that own them so the two never drift apart.

use super::file::config_directory;
use super::settings::*;
use crate::position::device::{
    DEFAULT_HIGH_ACCURACY_TIMEOUT, DEFAULT_LOW_POWER_MAXIMUM_AGE, DEFAULT_LOW_POWER_TIMEOUT,
};
use crate::position::predictor::{DEFAULT_MAX_HORIZON_SECS, DEFAULT_MIN_SPEED_MPS};
use crate::position::scheduler::{
    DEFAULT_FALLBACK_POSITION, DEFAULT_PRECISION_THRESHOLD_METERS, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_RETRY_MAX_DELAY,
};
use crate::position::smoother::{
    DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE, DEFAULT_WINDOW_SIZE,
};
use crate::navigation::DEFAULT_ARRIVAL_THRESHOLD_METERS;
use crate::position::sample::UNKNOWN_ACCURACY_METERS;
use crate::position::WindowWeighting;
use crate::routing::{
    DEFAULT_ORS_TIMEOUT, DEFAULT_ORS_URL, DEFAULT_OSRM_TIMEOUT, DEFAULT_OSRM_URL,
    DEFAULT_WALKING_SPEED_MPS,
};

/// Log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "villagenav.log";

/// Default log file path (~/.villagenav/villagenav.log).
pub fn default_log_file() -> std::path::PathBuf {
    config_directory().join(DEFAULT_LOG_FILE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            location: LocationSettings {
                default_longitude: DEFAULT_FALLBACK_POSITION.longitude,
                default_latitude: DEFAULT_FALLBACK_POSITION.latitude,
                default_accuracy: UNKNOWN_ACCURACY_METERS,
                precision_threshold: DEFAULT_PRECISION_THRESHOLD_METERS,
                high_accuracy_timeout_secs: DEFAULT_HIGH_ACCURACY_TIMEOUT.as_secs(),
                low_power_timeout_secs: DEFAULT_LOW_POWER_TIMEOUT.as_secs(),
                low_power_maximum_age_secs: DEFAULT_LOW_POWER_MAXIMUM_AGE.as_secs(),
                retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY.as_secs(),
                retry_max_delay_secs: DEFAULT_RETRY_MAX_DELAY.as_secs(),
                debug: false,
            },
            smoothing: SmoothingSettings {
                window_size: DEFAULT_WINDOW_SIZE,
                weighting: WindowWeighting::default(),
                process_noise: DEFAULT_PROCESS_NOISE,
                measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            },
            prediction: PredictionSettings {
                enabled: true,
                min_speed: DEFAULT_MIN_SPEED_MPS,
                horizon_secs: DEFAULT_MAX_HORIZON_SECS,
            },
            routing: RoutingSettings {
                osrm_url: DEFAULT_OSRM_URL.to_string(),
                osrm_timeout_secs: DEFAULT_OSRM_TIMEOUT.as_secs(),
                ors_url: DEFAULT_ORS_URL.to_string(),
                ors_api_key: None,
                ors_timeout_secs: DEFAULT_ORS_TIMEOUT.as_secs(),
                walking_speed: DEFAULT_WALKING_SPEED_MPS,
            },
            arrival: ArrivalSettings {
                threshold_meters: DEFAULT_ARRIVAL_THRESHOLD_METERS,
            },
            destinations: DestinationSettings::default(),
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
