//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`locate`] - Block/lot lookup
//! - [`route`] - Walking route between two points
//! - [`simulate`] - Replay a fix script through a tracking session

pub mod common;
pub mod config;
pub mod locate;
pub mod route;
pub mod simulate;
