//! Configuration file handling for ~/.villagenav/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use super::defaults::*;
pub use super::settings::*;

use crate::geo::Coordinate;
use crate::http::AsyncHttpClient;
use crate::navigation::{
    DestinationSource, LookupError, RestDestinationLookup, StaticDestinationTable,
};
use crate::position::{
    PredictorConfig, SchedulerConfig, SmootherConfig, TrackingConfig, WatchSettings,
};
use crate::routing::RouteResolverConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.villagenav/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.villagenav/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// The configured fallback position.
    pub fn default_position(&self) -> Coordinate {
        Coordinate::new(
            self.location.default_longitude,
            self.location.default_latitude,
        )
    }

    /// Build the runtime configuration for a tracking session.
    pub fn to_tracking_config(&self) -> TrackingConfig {
        let location = &self.location;
        TrackingConfig {
            scheduler: SchedulerConfig {
                precision_threshold_meters: location.precision_threshold,
                default_position: self.default_position(),
                default_accuracy_meters: location.default_accuracy,
                retry_base_delay: Duration::from_secs(location.retry_base_delay_secs),
                retry_max_delay: Duration::from_secs(location.retry_max_delay_secs),
            },
            smoother: SmootherConfig {
                process_noise: self.smoothing.process_noise,
                measurement_noise: self.smoothing.measurement_noise,
                window_size: self.smoothing.window_size,
                weighting: self.smoothing.weighting,
            },
            predictor: PredictorConfig {
                enabled: self.prediction.enabled,
                min_speed_mps: self.prediction.min_speed,
                max_horizon_secs: self.prediction.horizon_secs,
            },
            watch: WatchSettings {
                high_accuracy_timeout: Duration::from_secs(location.high_accuracy_timeout_secs),
                low_power_timeout: Duration::from_secs(location.low_power_timeout_secs),
                low_power_maximum_age: Duration::from_secs(location.low_power_maximum_age_secs),
            },
            debug_position: location.debug.then(|| self.default_position()),
        }
    }

    /// Build the runtime configuration for the route resolver.
    pub fn to_resolver_config(&self) -> RouteResolverConfig {
        RouteResolverConfig {
            osrm_url: self.routing.osrm_url.clone(),
            osrm_timeout: Duration::from_secs(self.routing.osrm_timeout_secs),
            ors_url: self.routing.ors_url.clone(),
            ors_api_key: self.routing.ors_api_key.clone(),
            ors_timeout: Duration::from_secs(self.routing.ors_timeout_secs),
            walking_speed_mps: self.routing.walking_speed,
        }
    }

    /// Build the destination lookup described by `[destinations]`.
    ///
    /// A local table takes precedence over the backend. Returns `None` when
    /// neither is configured.
    pub fn destination_source<C: AsyncHttpClient>(
        &self,
        http_client: C,
    ) -> Result<Option<DestinationSource<C>>, LookupError> {
        let settings = &self.destinations;
        if let Some(path) = &settings.table {
            let table = StaticDestinationTable::load(path)?;
            tracing::debug!(
                path = %path.display(),
                entries = table.len(),
                "Loaded destination table"
            );
            return Ok(Some(DestinationSource::Static(table)));
        }
        Ok(settings.rest_url.as_ref().map(|url| {
            DestinationSource::Rest(RestDestinationLookup::new(
                http_client,
                url.clone(),
                settings.api_key.clone().unwrap_or_default(),
            ))
        }))
    }
}

/// Get the path to the config directory (~/.villagenav).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".villagenav")
}

/// Get the path to the config file (~/.villagenav/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
