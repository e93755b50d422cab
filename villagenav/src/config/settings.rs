//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::position::WindowWeighting;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Location acquisition settings
    pub location: LocationSettings,
    /// Position smoothing settings
    pub smoothing: SmoothingSettings,
    /// Dead-reckoning settings
    pub prediction: PredictionSettings,
    /// Routing service settings
    pub routing: RoutingSettings,
    /// Arrival detection settings
    pub arrival: ArrivalSettings,
    /// Destination backend settings
    pub destinations: DestinationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Location acquisition configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    /// Fallback longitude when no fix can be acquired
    pub default_longitude: f64,
    /// Fallback latitude when no fix can be acquired
    pub default_latitude: f64,
    /// Accuracy reported for the fallback position (meters)
    pub default_accuracy: f64,
    /// Fixes better than this (meters) end high-accuracy acquisition
    pub precision_threshold: f64,
    /// High-accuracy watch timeout in seconds
    pub high_accuracy_timeout_secs: u64,
    /// Low-power watch timeout in seconds
    pub low_power_timeout_secs: u64,
    /// Oldest cached fix accepted in low-power mode, in seconds
    pub low_power_maximum_age_secs: u64,
    /// First retry delay after a low-power failure, in seconds
    pub retry_base_delay_secs: u64,
    /// Maximum retry delay, in seconds
    pub retry_max_delay_secs: u64,
    /// Pin the position to the default coordinate instead of acquiring
    pub debug: bool,
}

/// Smoother configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingSettings {
    pub window_size: usize,
    pub weighting: WindowWeighting,
    pub process_noise: f64,
    pub measurement_noise: f64,
}

/// Dead-reckoning configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSettings {
    pub enabled: bool,
    /// Speeds at or below this (m/s) are treated as noise
    pub min_speed: f64,
    /// Maximum projection horizon in seconds
    pub horizon_secs: f64,
}

/// Routing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSettings {
    pub osrm_url: String,
    pub osrm_timeout_secs: u64,
    pub ors_url: String,
    /// OpenRouteService API key; the secondary router is skipped without it
    pub ors_api_key: Option<String>,
    pub ors_timeout_secs: u64,
    /// Walking speed used by the straight-line fallback (m/s)
    pub walking_speed: f64,
}

/// Arrival configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalSettings {
    pub threshold_meters: f64,
}

/// Destination backend configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestinationSettings {
    /// Base URL of the PostgREST backend
    pub rest_url: Option<String>,
    /// Backend API key
    pub api_key: Option<String>,
    /// Local JSON destination table, used instead of the backend when set
    pub table: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
