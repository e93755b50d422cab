//! Common types and utilities shared across CLI commands.

use clap::Args;
use villagenav::navigation::DestinationId;
use villagenav::routing::Route;

use crate::error::CliError;

/// Block/lot selection for CLI arguments.
#[derive(Debug, Clone, Args)]
pub struct DestinationArgs {
    /// Block of the destination lot
    #[arg(long, requires = "lot")]
    pub block: Option<String>,

    /// Lot number within the block
    #[arg(long, requires = "block")]
    pub lot: Option<String>,
}

impl DestinationArgs {
    /// The selected destination, if both parts were given.
    pub fn id(&self) -> Option<DestinationId> {
        match (&self.block, &self.lot) {
            (Some(block), Some(lot)) => Some(DestinationId::new(block, lot)),
            _ => None,
        }
    }
}

/// Print a route summary for humans.
pub fn print_route(route: &Route) {
    println!("Provider: {}", route.provider);
    println!("Distance: {:.0} m", route.distance_meters);
    println!("Duration: {}", format_duration(route.duration_seconds));
    println!("Points:   {}", route.coordinates.len());
    if let (Some(start), Some(end)) = (route.start(), route.end()) {
        println!("From:     {}", start);
        println!("To:       {}", end);
    }
}

/// Print any serializable value as a single JSON line.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Format seconds as `M min S s`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    match (total / 60, total % 60) {
        (0, s) => format!("{} s", s),
        (m, 0) => format!("{} min", m),
        (m, s) => format!("{} min {} s", m, s),
    }
}
