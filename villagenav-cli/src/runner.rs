//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and construction of
//! the library components shared across command handlers.

use crate::error::CliError;
use tracing::info;
use villagenav::config::ConfigFile;
use villagenav::http::AsyncReqwestClient;
use villagenav::logging::{init_logging, LoggingGuard};
use villagenav::navigation::{DestinationSource, Navigator, StaticDestinationTable};
use villagenav::routing::RouteResolver;

/// Navigator wired to the configured backend and the live routing chain.
pub type CliNavigator = Navigator<DestinationSource<AsyncReqwestClient>, AsyncReqwestClient>;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    http_client: AsyncReqwestClient,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `verbose` - Mirror log output to stderr
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = ConfigFile::load()?;

        let logging_guard = init_logging(&config.logging.file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let http_client = AsyncReqwestClient::new().map_err(CliError::HttpClient)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            http_client,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("villagenav v{}", villagenav::VERSION);
        info!("villagenav CLI: {} command", command);
    }

    /// Route resolver built from `[routing]`.
    pub fn resolver(&self) -> RouteResolver<AsyncReqwestClient> {
        RouteResolver::from_config(self.http_client.clone(), &self.config.to_resolver_config())
    }

    /// Destination lookup built from `[destinations]`.
    pub fn destinations(&self) -> Result<DestinationSource<AsyncReqwestClient>, CliError> {
        self.config
            .destination_source(self.http_client.clone())?
            .ok_or_else(|| {
                CliError::Config(
                    "No destination source configured. \
                     Set destinations.rest_url or destinations.table in config.ini"
                        .to_string(),
                )
            })
    }

    /// Navigator combining the configured lookup, resolver and arrival threshold.
    pub fn navigator(&self) -> Result<CliNavigator, CliError> {
        Ok(Navigator::new(
            self.destinations()?,
            self.resolver(),
            self.config.arrival.threshold_meters,
        ))
    }

    /// Navigator for destinations given as coordinates; no lookups.
    pub fn offline_navigator(&self) -> CliNavigator {
        Navigator::new(
            DestinationSource::Static(StaticDestinationTable::default()),
            self.resolver(),
            self.config.arrival.threshold_meters,
        )
    }
}
