//! Simulate command - replay a recorded fix script through a live session.
//!
//! The script is a JSON array of events:
//!
//! ```text
//! [
//!   {"fix": {"longitude": 120.9513, "latitude": 14.3478, "accuracy": 25.0}},
//!   {"error": "timeout"},
//!   {"pause": 1500}
//! ]
//! ```
//!
//! Every estimate the session publishes is printed. With a destination
//! (`--block`/`--lot` or `--to`) the route is resolved once from the first
//! estimate and arrival is reported.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use villagenav::geo::Coordinate;
use villagenav::navigation::{ArrivalStatus, Destination, DestinationId};
use villagenav::position::{
    spawn_position_logger, ScriptedLocationProvider, SchedulerState, SmoothedEstimate,
    TrackingSession, DEFAULT_LOG_INTERVAL,
};
use villagenav::time::epoch_millis_now;

use super::common::{print_json, print_route, DestinationArgs};
use crate::error::CliError;
use crate::runner::{CliNavigator, CliRunner};

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub fixes: PathBuf,
    pub to: Option<Coordinate>,
    pub destination: DestinationArgs,
    pub heading: Option<f64>,
    pub interval: Duration,
    pub linger: Duration,
    pub json: bool,
}

/// One line of JSON output.
#[derive(Serialize)]
struct SimulateLine {
    estimate: SmoothedEstimate,
    predicted: Option<SmoothedEstimate>,
    state: SchedulerState,
    arrival: Option<ArrivalStatus>,
}

/// Run the simulate command.
pub async fn run(runner: &CliRunner, args: SimulateArgs) -> Result<(), CliError> {
    runner.log_startup("simulate");

    let script = std::fs::read_to_string(&args.fixes).map_err(|e| CliError::Script {
        path: args.fixes.display().to_string(),
        error: e.to_string(),
    })?;
    let provider = ScriptedLocationProvider::from_json(&script)
        .map_err(|e| CliError::Script {
            path: args.fixes.display().to_string(),
            error: e.to_string(),
        })?
        .with_interval(args.interval);
    let exhausted = provider.exhausted();

    let navigator = match (args.to, args.destination.id()) {
        (Some(to), _) => {
            let navigator = runner.offline_navigator();
            navigator.select(
                Destination::new(DestinationId::new("-", "-"), to).with_label("Pinned point"),
            );
            if !args.json {
                println!("Destination: pinned point at {}", to);
            }
            Some(navigator)
        }
        (None, Some(id)) => {
            let navigator = runner.navigator()?;
            let destination = navigator.set_destination(&id).await?;
            if !args.json {
                println!("Destination: {} at {}", id, destination.coordinates);
            }
            Some(navigator)
        }
        (None, None) => None,
    };

    // Kept alive for the whole session so the compass reading persists
    let (heading_tx, heading_rx) = mpsc::channel(1);
    let heading_rx = match args.heading {
        Some(degrees) => {
            let _ = heading_tx.try_send(degrees);
            Some(heading_rx)
        }
        None => None,
    };

    let session = TrackingSession::start(
        provider,
        heading_rx,
        runner.config().to_tracking_config(),
    );
    let mut updates = session.subscribe();
    let logger_cancel = CancellationToken::new();
    spawn_position_logger(session.reader(), logger_cancel.clone(), DEFAULT_LOG_INTERVAL);

    // A pinned debug position is published before we could subscribe
    if let Some(estimate) = session.current_estimate() {
        report(&session, navigator.as_ref(), estimate, args.json).await?;
    }

    // Debug mode opens no watch, so the script is never consumed
    let result = if runner.config().location.debug {
        Ok(())
    } else {
        follow(&session, &mut updates, navigator.as_ref(), &exhausted, &args).await
    };

    session.stop();
    session.join().await;
    logger_cancel.cancel();
    drop(heading_tx);

    if !args.json {
        let status = session.status();
        println!();
        println!(
            "Session ended: {} fixes applied, {} rejected, {} consecutive failures",
            status.fixes_applied, status.fixes_rejected, status.consecutive_failures
        );
    }

    result
}

async fn follow(
    session: &TrackingSession,
    updates: &mut broadcast::Receiver<SmoothedEstimate>,
    navigator: Option<&CliNavigator>,
    exhausted: &CancellationToken,
    args: &SimulateArgs,
) -> Result<(), CliError> {
    let done = async {
        exhausted.cancelled().await;
        tokio::time::sleep(args.interval + args.linger).await;
    };
    tokio::pin!(done);

    loop {
        tokio::select! {
            _ = &mut done => return Ok(()),
            update = updates.recv() => match update {
                Ok(estimate) => report(session, navigator, estimate, args.json).await?,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Output fell behind, skipping estimates");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn report(
    session: &TrackingSession,
    navigator: Option<&CliNavigator>,
    estimate: SmoothedEstimate,
    json: bool,
) -> Result<(), CliError> {
    let arrival = match navigator {
        Some(navigator) => {
            // Compute the route once, from the first position we have
            if navigator.route().is_none() {
                let route = navigator.start(estimate.coordinate()).await?;
                if !json {
                    print_route(&route);
                    println!();
                }
            }
            Some(navigator.check_arrival(&estimate)?)
        }
        None => None,
    };

    let predicted = session
        .predicted_estimate(epoch_millis_now())
        .filter(|p| p.coordinate() != estimate.coordinate());

    if json {
        return print_json(&SimulateLine {
            estimate,
            predicted,
            state: session.state(),
            arrival,
        });
    }

    let mut line = format!(
        "[{:>9}] {}  ±{:.0} m  {}",
        estimate.source.to_string(),
        estimate.coordinate(),
        estimate.accuracy_meters,
        session.state()
    );
    if let Some(p) = predicted {
        line.push_str(&format!("  ahead {}", p.coordinate()));
    }
    match arrival {
        Some(ArrivalStatus::EnRoute(distance)) => {
            line.push_str(&format!("  {:.0} m to go", distance))
        }
        Some(ArrivalStatus::JustArrived) => line.push_str("  ARRIVED"),
        Some(ArrivalStatus::AlreadyArrived) => line.push_str("  (arrived)"),
        None => {}
    }
    println!("{}", line);
    Ok(())
}
