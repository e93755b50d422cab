//! villagenav CLI - Command-line interface
//!
//! This binary provides a command-line interface to the villagenav library:
//! look up lots, resolve walking routes, and replay recorded location feeds
//! through the tracking pipeline.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use villagenav::geo::Coordinate;

use commands::common::DestinationArgs;
use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "villagenav")]
#[command(version = villagenav::VERSION)]
#[command(
    about = "Walking navigation to block/lot addresses inside the village",
    long_about = None
)]
struct Cli {
    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a walking route
    Route {
        /// Start as LON,LAT (default: the configured default position)
        #[arg(long)]
        from: Option<Coordinate>,

        /// Destination as LON,LAT
        #[arg(long, conflicts_with_all = ["block", "lot"])]
        to: Option<Coordinate>,

        #[command(flatten)]
        destination: DestinationArgs,

        /// Print the route as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up the coordinates of a block/lot
    Locate {
        /// Block of the lot
        #[arg(long)]
        block: String,

        /// Lot number within the block
        #[arg(long)]
        lot: String,

        /// Print the destination as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a recorded fix script through a tracking session
    Simulate {
        /// JSON file with the fix script
        #[arg(long)]
        fixes: PathBuf,

        /// Destination as LON,LAT
        #[arg(long, conflicts_with_all = ["block", "lot"])]
        to: Option<Coordinate>,

        #[command(flatten)]
        destination: DestinationArgs,

        /// Fixed compass heading in degrees, used for dead reckoning
        #[arg(long)]
        heading: Option<f64>,

        /// Milliseconds between scripted events
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Seconds to keep listening after the script ends
        #[arg(long, default_value = "2")]
        linger_secs: u64,

        /// Print one JSON object per estimate
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Route {
            from,
            to,
            destination,
            json,
        } => {
            let runner = CliRunner::new(cli.verbose)?;
            commands::route::run(
                &runner,
                commands::route::RouteArgs {
                    from,
                    to,
                    destination,
                    json,
                },
            )
            .await
        }
        Commands::Locate { block, lot, json } => {
            let runner = CliRunner::new(cli.verbose)?;
            let id = villagenav::navigation::DestinationId::new(block, lot);
            commands::locate::run(&runner, id, json).await
        }
        Commands::Simulate {
            fixes,
            to,
            destination,
            heading,
            interval_ms,
            linger_secs,
            json,
        } => {
            let runner = CliRunner::new(cli.verbose)?;
            commands::simulate::run(
                &runner,
                commands::simulate::SimulateArgs {
                    fixes,
                    to,
                    destination,
                    heading,
                    interval: Duration::from_millis(interval_ms),
                    linger: Duration::from_secs(linger_secs),
                    json,
                },
            )
            .await
        }
    }
}
