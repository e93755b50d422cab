//! User configuration.
//!
//! Settings are read from `~/.villagenav/config.ini`. Missing keys keep
//! their defaults, and invalid values are reported with the section and key
//! they came from.
//!
//! # Example
//!
//! ```ignore
//! use villagenav::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let session = TrackingSession::start(provider, None, config.to_tracking_config());
//! let resolver = RouteResolver::from_config(client, &config.to_resolver_config());
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{
    config_directory, config_file_path, default_log_file, ArrivalSettings, ConfigFile,
    ConfigFileError, DestinationSettings, LocationSettings, LoggingSettings, PredictionSettings,
    RoutingSettings, SmoothingSettings, DEFAULT_LOG_FILE_NAME,
};
