//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let location = &config.location;
    let smoothing = &config.smoothing;
    let prediction = &config.prediction;
    let routing = &config.routing;
    let destinations = &config.destinations;

    let ors_api_key = routing.ors_api_key.as_deref().unwrap_or("");
    let rest_url = destinations.rest_url.as_deref().unwrap_or("");
    let rest_api_key = destinations.api_key.as_deref().unwrap_or("");
    let table = destinations
        .table
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[location]
; Position shown when no fix can be acquired (default: village entrance)
default_longitude = {}
default_latitude = {}
; Accuracy reported for the default position, in meters
default_accuracy = {}
; A fix better than this (meters) switches acquisition to low power
precision_threshold = {}
; Seconds to wait for a fix before the watch counts as failed
high_accuracy_timeout = {}
low_power_timeout = {}
; Oldest cached fix (seconds) accepted in low power mode
low_power_maximum_age = {}
; Retry delays after low power failures, in seconds (doubles up to the max)
retry_base_delay = {}
retry_max_delay = {}
; Pin the position to the default coordinate (for testing without a device)
debug = {}

[smoothing]
; Number of recent filtered positions averaged into the estimate
window_size = {}
; Window weighting: uniform or recency
weighting = {}
; Filter tuning. Higher process noise follows movement faster,
; higher measurement noise trusts new fixes less.
process_noise = {}
measurement_noise = {}

[prediction]
; Project the position forward between fixes using heading and speed
enabled = {}
; Speeds at or below this (m/s) are treated as standing still
min_speed = {}
; Maximum projection time in seconds
horizon = {}

[routing]
; Primary router (OSRM, foot profile)
osrm_url = {}
osrm_timeout = {}
; Secondary router (OpenRouteService). Skipped when no API key is set.
; Get a key at: https://openrouteservice.org/dev/#/signup
ors_url = {}
ors_api_key = {}
ors_timeout = {}
; Walking speed (m/s) used to estimate duration of the straight-line fallback
walking_speed = {}

[arrival]
; Distance in meters at which the destination counts as reached
threshold = {}

[destinations]
; Block/lot lookup backend (PostgREST). Leave empty to use a local table.
rest_url = {}
api_key = {}
; Local JSON destination table, used instead of the backend when set
table = {}

[logging]
; Log file, cleared at the start of every session
file = {}
"#,
        location.default_longitude,
        location.default_latitude,
        location.default_accuracy,
        location.precision_threshold,
        location.high_accuracy_timeout_secs,
        location.low_power_timeout_secs,
        location.low_power_maximum_age_secs,
        location.retry_base_delay_secs,
        location.retry_max_delay_secs,
        location.debug,
        smoothing.window_size,
        smoothing.weighting,
        smoothing.process_noise,
        smoothing.measurement_noise,
        prediction.enabled,
        prediction.min_speed,
        prediction.horizon_secs,
        routing.osrm_url,
        routing.osrm_timeout_secs,
        routing.ors_url,
        ors_api_key,
        routing.ors_timeout_secs,
        routing.walking_speed,
        config.arrival.threshold_meters,
        rest_url,
        rest_api_key,
        table,
        path_to_string(&config.logging.file),
    )
}

/// Render a path with the home directory collapsed to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use crate::position::WindowWeighting;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.location.debug = true;
        config.location.precision_threshold = 12.5;
        config.smoothing.weighting = WindowWeighting::Uniform;
        config.routing.ors_api_key = Some("test-api-key".to_string());
        config.destinations.table = Some(temp_dir.path().join("lots.json"));
        config.logging.file = PathBuf::from("/var/log/villagenav.log");

        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();

        assert_eq!(
            ConfigFile::load_from(&config_path).unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn test_written_file_is_commented() {
        let content = super::to_config_string(&ConfigFile::default());
        assert!(content.starts_with("[location]"));
        assert!(content.contains("; Distance in meters"));
        assert!(content.contains("ors_api_key = \n"));
    }
}
