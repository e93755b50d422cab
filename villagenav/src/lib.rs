//! villagenav - Walking navigation inside a residential village
//!
//! This library turns a noisy device location feed into a steady "you are
//! here" estimate, resolves walking routes to a block/lot destination with
//! graceful degradation, and reports arrival.
//!
//! # High-Level API
//!
//! ```ignore
//! use villagenav::config::ConfigFile;
//! use villagenav::http::AsyncReqwestClient;
//! use villagenav::navigation::{DestinationId, Navigator};
//! use villagenav::position::TrackingSession;
//! use villagenav::routing::RouteResolver;
//!
//! let config = ConfigFile::load()?;
//! let client = AsyncReqwestClient::new()?;
//!
//! let session = TrackingSession::start(provider, None, config.to_tracking_config());
//! let navigator = Navigator::new(
//!     config.destination_source(client.clone())?.unwrap(),
//!     RouteResolver::from_config(client, &config.to_resolver_config()),
//!     config.arrival.threshold_meters,
//! );
//!
//! navigator.set_destination(&DestinationId::new("3", "12")).await?;
//! let route = navigator.start(session.current_estimate().unwrap().coordinate()).await?;
//! ```

pub mod config;
pub mod geo;
pub mod http;
pub mod logging;
pub mod navigation;
pub mod position;
pub mod routing;
pub mod time;

/// Version of the villagenav library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
