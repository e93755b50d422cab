//! Route command - resolve a walking route.

use villagenav::geo::Coordinate;
use villagenav::routing::{Route, RouteProvider};

use super::common::{print_json, print_route, DestinationArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the route command.
pub struct RouteArgs {
    pub from: Option<Coordinate>,
    pub to: Option<Coordinate>,
    pub destination: DestinationArgs,
    pub json: bool,
}

/// Run the route command.
pub async fn run(runner: &CliRunner, args: RouteArgs) -> Result<(), CliError> {
    runner.log_startup("route");

    // No --from: start at the configured default position
    let from = args.from.unwrap_or_else(|| runner.config().default_position());

    let route = match (args.to, args.destination.id()) {
        (Some(to), _) => runner.resolver().resolve_route(from, to).await?,
        (None, Some(id)) => {
            let navigator = runner.navigator()?;
            let destination = navigator.set_destination(&id).await?;
            if !args.json {
                match &destination.label {
                    Some(label) => println!("Destination: {} ({})", id, label),
                    None => println!("Destination: {}", id),
                }
            }
            navigator.start(from).await?
        }
        (None, None) => {
            return Err(CliError::Config(
                "a destination is required: use --to LON,LAT or --block and --lot".to_string(),
            ))
        }
    };

    report(&route, args.json)
}

fn report(route: &Route, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(route);
    }
    print_route(route);
    if route.provider == RouteProvider::Fallback {
        println!();
        println!("Routing services were unavailable; showing a straight line.");
    }
    Ok(())
}
