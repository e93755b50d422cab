//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use villagenav::config::ConfigFileError;
use villagenav::http::HttpError;
use villagenav::navigation::{LookupError, NavigationError};
use villagenav::routing::RoutingError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to create the HTTP client
    HttpClient(HttpError),
    /// Destination lookup failed
    Lookup(LookupError),
    /// Route resolution failed
    Routing(RoutingError),
    /// Failed to read a fix script
    Script { path: String, error: String },
    /// Failed to write output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Lookup(LookupError::Http(_)) => {
                eprintln!();
                eprintln!("Could not reach the destination backend. Check that:");
                eprintln!("  1. destinations.rest_url in config.ini is correct");
                eprintln!("  2. destinations.api_key is set if the backend requires one");
                eprintln!("Alternatively set destinations.table to a local JSON table.");
            }
            CliError::Config(msg) if msg.contains("No destination source") => {
                eprintln!();
                eprintln!("Run 'villagenav config init' and fill in the [destinations] section.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Lookup(e) => write!(f, "Destination lookup failed: {}", e),
            CliError::Routing(e) => write!(f, "Routing failed: {}", e),
            CliError::Script { path, error } => {
                write!(f, "Failed to read fix script '{}': {}", path, error)
            }
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::HttpClient(e) => Some(e),
            CliError::Lookup(e) => Some(e),
            CliError::Routing(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LookupError> for CliError {
    fn from(e: LookupError) -> Self {
        CliError::Lookup(e)
    }
}

impl From<RoutingError> for CliError {
    fn from(e: RoutingError) -> Self {
        CliError::Routing(e)
    }
}

impl From<NavigationError> for CliError {
    fn from(e: NavigationError) -> Self {
        match e {
            NavigationError::Lookup(e) => CliError::Lookup(e),
            NavigationError::Routing(e) => CliError::Routing(e),
            NavigationError::NoDestination => {
                CliError::Config("no destination selected".to_string())
            }
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
