//! Locate command - look up a block/lot.

use villagenav::navigation::{DestinationId, DestinationLookup};

use super::common::print_json;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the locate command.
pub async fn run(runner: &CliRunner, id: DestinationId, json: bool) -> Result<(), CliError> {
    runner.log_startup("locate");

    let destination = runner.destinations()?.lookup(&id).await?;

    if json {
        return print_json(&destination);
    }

    println!("{}", destination.id);
    if let Some(label) = &destination.label {
        println!("  Label:       {}", label);
    }
    println!("  Coordinates: {}", destination.coordinates);
    Ok(())
}
