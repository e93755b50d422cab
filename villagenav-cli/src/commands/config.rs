//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for inspecting
//! and creating the configuration file.

use clap::Subcommand;
use villagenav::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration (file values over defaults)
    Show,

    /// Write a commented configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(force),
    }
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load_from(&path)?;

    if !path.exists() {
        println!("; {} does not exist, showing defaults", path.display());
    }

    let location = &config.location;
    let routing = &config.routing;
    let destinations = &config.destinations;

    println!("[location]");
    println!("default_position      = {}", config.default_position());
    println!("default_accuracy      = {} m", location.default_accuracy);
    println!("precision_threshold   = {} m", location.precision_threshold);
    println!("high_accuracy_timeout = {} s", location.high_accuracy_timeout_secs);
    println!("low_power_timeout     = {} s", location.low_power_timeout_secs);
    println!("low_power_maximum_age = {} s", location.low_power_maximum_age_secs);
    println!(
        "retry_delay           = {} s .. {} s",
        location.retry_base_delay_secs, location.retry_max_delay_secs
    );
    println!("debug                 = {}", location.debug);
    println!();
    println!("[smoothing]");
    println!("window_size           = {}", config.smoothing.window_size);
    println!("weighting             = {}", config.smoothing.weighting);
    println!("process_noise         = {}", config.smoothing.process_noise);
    println!("measurement_noise     = {}", config.smoothing.measurement_noise);
    println!();
    println!("[prediction]");
    println!("enabled               = {}", config.prediction.enabled);
    println!("min_speed             = {} m/s", config.prediction.min_speed);
    println!("horizon               = {} s", config.prediction.horizon_secs);
    println!();
    println!("[routing]");
    println!("osrm_url              = {}", routing.osrm_url);
    println!("ors_url               = {}", routing.ors_url);
    println!("ors_api_key           = {}", mask(routing.ors_api_key.as_deref()));
    println!("walking_speed         = {} m/s", routing.walking_speed);
    println!();
    println!("[arrival]");
    println!("threshold             = {} m", config.arrival.threshold_meters);
    println!();
    println!("[destinations]");
    println!(
        "rest_url              = {}",
        destinations.rest_url.as_deref().unwrap_or("(not set)")
    );
    println!("api_key               = {}", mask(destinations.api_key.as_deref()));
    println!(
        "table                 = {}",
        destinations
            .table
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!();
    println!("[logging]");
    println!("file                  = {}", config.logging.file.display());

    Ok(())
}

fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Hide secrets, keeping a hint of which key is configured.
fn mask(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 4 => "****".to_string(),
        Some(s) => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            format!("****{}", tail)
        }
    }
}
