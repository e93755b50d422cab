//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::geo::{is_valid_latitude, is_valid_longitude};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [location] section
    if let Some(section) = ini.section(Some("location")) {
        if let Some(v) = section.get("default_longitude") {
            let lon: f64 = parse_number("location", "default_longitude", v, "must be a number")?;
            if !is_valid_longitude(lon) {
                return Err(invalid(
                    "location",
                    "default_longitude",
                    v,
                    "must be between -180 and 180",
                ));
            }
            config.location.default_longitude = lon;
        }
        if let Some(v) = section.get("default_latitude") {
            let lat: f64 = parse_number("location", "default_latitude", v, "must be a number")?;
            if !is_valid_latitude(lat) {
                return Err(invalid(
                    "location",
                    "default_latitude",
                    v,
                    "must be between -90 and 90",
                ));
            }
            config.location.default_latitude = lat;
        }
        if let Some(v) = section.get("default_accuracy") {
            config.location.default_accuracy = parse_positive("location", "default_accuracy", v)?;
        }
        if let Some(v) = section.get("precision_threshold") {
            config.location.precision_threshold =
                parse_positive("location", "precision_threshold", v)?;
        }
        if let Some(v) = section.get("high_accuracy_timeout") {
            config.location.high_accuracy_timeout_secs =
                parse_seconds("location", "high_accuracy_timeout", v)?;
        }
        if let Some(v) = section.get("low_power_timeout") {
            config.location.low_power_timeout_secs =
                parse_seconds("location", "low_power_timeout", v)?;
        }
        if let Some(v) = section.get("low_power_maximum_age") {
            config.location.low_power_maximum_age_secs = parse_number(
                "location",
                "low_power_maximum_age",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("retry_base_delay") {
            config.location.retry_base_delay_secs =
                parse_seconds("location", "retry_base_delay", v)?;
        }
        if let Some(v) = section.get("retry_max_delay") {
            config.location.retry_max_delay_secs =
                parse_seconds("location", "retry_max_delay", v)?;
        }
        if let Some(v) = section.get("debug") {
            config.location.debug = parse_bool(v);
        }
    }

    if config.location.retry_max_delay_secs < config.location.retry_base_delay_secs {
        return Err(invalid(
            "location",
            "retry_max_delay",
            &config.location.retry_max_delay_secs.to_string(),
            "must not be smaller than retry_base_delay",
        ));
    }

    // [smoothing] section
    if let Some(section) = ini.section(Some("smoothing")) {
        if let Some(v) = section.get("window_size") {
            let size: usize = parse_number(
                "smoothing",
                "window_size",
                v,
                "must be a positive integer",
            )?;
            if size == 0 {
                return Err(invalid(
                    "smoothing",
                    "window_size",
                    v,
                    "must be a positive integer",
                ));
            }
            config.smoothing.window_size = size;
        }
        if let Some(v) = section.get("weighting") {
            config.smoothing.weighting = v.parse().map_err(|_| {
                invalid("smoothing", "weighting", v, "must be 'uniform' or 'recency'")
            })?;
        }
        if let Some(v) = section.get("process_noise") {
            config.smoothing.process_noise = parse_positive("smoothing", "process_noise", v)?;
        }
        if let Some(v) = section.get("measurement_noise") {
            config.smoothing.measurement_noise =
                parse_positive("smoothing", "measurement_noise", v)?;
        }
    }

    // [prediction] section
    if let Some(section) = ini.section(Some("prediction")) {
        if let Some(v) = section.get("enabled") {
            config.prediction.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("min_speed") {
            let speed: f64 = parse_number("prediction", "min_speed", v, "must be a number")?;
            if !speed.is_finite() || speed < 0.0 {
                return Err(invalid(
                    "prediction",
                    "min_speed",
                    v,
                    "must be zero or a positive number (m/s)",
                ));
            }
            config.prediction.min_speed = speed;
        }
        if let Some(v) = section.get("horizon") {
            config.prediction.horizon_secs = parse_positive("prediction", "horizon", v)?;
        }
    }

    // [routing] section
    if let Some(section) = ini.section(Some("routing")) {
        if let Some(v) = section.get("osrm_url") {
            config.routing.osrm_url = parse_url("routing", "osrm_url", v)?;
        }
        if let Some(v) = section.get("osrm_timeout") {
            config.routing.osrm_timeout_secs = parse_seconds("routing", "osrm_timeout", v)?;
        }
        if let Some(v) = section.get("ors_url") {
            config.routing.ors_url = parse_url("routing", "ors_url", v)?;
        }
        if let Some(v) = section.get("ors_api_key") {
            config.routing.ors_api_key = non_empty(v);
        }
        if let Some(v) = section.get("ors_timeout") {
            config.routing.ors_timeout_secs = parse_seconds("routing", "ors_timeout", v)?;
        }
        if let Some(v) = section.get("walking_speed") {
            config.routing.walking_speed = parse_positive("routing", "walking_speed", v)?;
        }
    }

    // [arrival] section
    if let Some(section) = ini.section(Some("arrival")) {
        if let Some(v) = section.get("threshold") {
            config.arrival.threshold_meters = parse_positive("arrival", "threshold", v)?;
        }
    }

    // [destinations] section
    if let Some(section) = ini.section(Some("destinations")) {
        if let Some(v) = section.get("rest_url") {
            config.destinations.rest_url = match non_empty(v) {
                Some(url) => Some(parse_url("destinations", "rest_url", &url)?),
                None => None,
            };
        }
        if let Some(v) = section.get("api_key") {
            config.destinations.api_key = non_empty(v);
        }
        if let Some(v) = section.get("table") {
            config.destinations.table = non_empty(v).map(|p| expand_tilde(&p));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Finite, strictly positive float.
fn parse_positive(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let reason = "must be a positive number";
    let n: f64 = parse_number(section, key, value, reason)?;
    if !n.is_finite() || n <= 0.0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(n)
}

/// Strictly positive whole seconds.
fn parse_seconds(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    let reason = "must be a positive integer (seconds)";
    let n: u64 = parse_number(section, key, value, reason)?;
    if n == 0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(n)
}

fn parse_url(section: &str, key: &str, value: &str) -> Result<String, ConfigFileError> {
    let v = value.trim();
    let parsed = reqwest::Url::parse(v)
        .map_err(|e| invalid(section, key, value, &format!("not a valid URL: {}", e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(section, key, value, "must be an http or https URL"));
    }
    Ok(v.trim_end_matches('/').to_string())
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Parse a boolean value from a string.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::WindowWeighting;
    use tempfile::TempDir;

    fn load(contents: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, contents).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = load("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[location]
precision_threshold = 20
debug = yes

[arrival]
threshold = 7.5
"#,
        )
        .unwrap();

        assert_eq!(config.location.precision_threshold, 20.0);
        assert!(config.location.debug);
        assert_eq!(config.arrival.threshold_meters, 7.5);
        // Untouched sections keep their defaults
        assert_eq!(config.smoothing, ConfigFile::default().smoothing);
        assert_eq!(config.routing, ConfigFile::default().routing);
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[location]
default_longitude = 121.0
default_latitude = 14.5
default_accuracy = 500
high_accuracy_timeout = 20
low_power_timeout = 8
low_power_maximum_age = 0
retry_base_delay = 2
retry_max_delay = 30

[smoothing]
window_size = 8
weighting = uniform
process_noise = 0.02
measurement_noise = 0.2

[prediction]
enabled = false
min_speed = 0.5
horizon = 3

[routing]
osrm_url = http://localhost:5000/
osrm_timeout = 4
ors_api_key = secret
walking_speed = 1.2

[destinations]
rest_url = https://village.example.org
api_key = anon
table = /srv/lots.json
"#,
        )
        .unwrap();

        assert_eq!(config.location.default_longitude, 121.0);
        assert_eq!(config.location.default_latitude, 14.5);
        assert_eq!(config.location.low_power_maximum_age_secs, 0);
        assert_eq!(config.location.retry_max_delay_secs, 30);
        assert_eq!(config.smoothing.window_size, 8);
        assert_eq!(config.smoothing.weighting, WindowWeighting::Uniform);
        assert!(!config.prediction.enabled);
        assert_eq!(config.prediction.horizon_secs, 3.0);
        assert_eq!(config.routing.osrm_url, "http://localhost:5000");
        assert_eq!(config.routing.ors_api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.destinations.rest_url.as_deref(),
            Some("https://village.example.org")
        );
        assert_eq!(config.destinations.table, Some(PathBuf::from("/srv/lots.json")));
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let config = load("[routing]\nors_api_key =   \n").unwrap();
        assert!(config.routing.ors_api_key.is_none());
    }

    #[test]
    fn test_invalid_latitude() {
        let err = load("[location]\ndefault_latitude = 95\n").unwrap_err();
        assert!(err.to_string().contains("default_latitude"));
        assert!(err.to_string().contains("between -90 and 90"));
    }

    #[test]
    fn test_invalid_threshold() {
        let err = load("[arrival]\nthreshold = -1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref section, ref key, .. }
                if section == "arrival" && key == "threshold"
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = load("[smoothing]\nwindow_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("window_size"));
    }

    #[test]
    fn test_unknown_weighting_rejected() {
        let err = load("[smoothing]\nweighting = exponential\n").unwrap_err();
        assert!(err.to_string().contains("uniform"));
    }

    #[test]
    fn test_retry_delays_must_be_ordered() {
        let err = load("[location]\nretry_base_delay = 10\nretry_max_delay = 5\n").unwrap_err();
        assert!(err.to_string().contains("retry_max_delay"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = load("[routing]\nosrm_url = ftp://example.org\n").unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" ON "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
