//! Integration tests for live tracking.
//!
//! These tests verify the complete position flows:
//! - Config file → tracking session → scheduler mode switches
//! - Scripted device feed (JSON) → smoothed estimates → arrival
//! - No usable device → default position → offline straight-line route
//!
//! Run with: `cargo test --test tracking_integration`

use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use villagenav::config::ConfigFile;
use villagenav::geo::{offset_meters, Coordinate};
use villagenav::http::{AsyncHttpClient, HttpError};
use villagenav::navigation::{
    ArrivalStatus, Destination, DestinationId, Navigator, StaticDestinationTable,
};
use villagenav::position::{
    AcquisitionMode, ScriptedLocationProvider, SchedulerState, SmoothedEstimate, SourceTag,
    TrackingSession,
};
use villagenav::routing::{RouteProvider, RouteResolver};

// ============================================================================
// Test Helpers
// ============================================================================

/// HTTP client with no network.
#[derive(Clone)]
struct Offline;

impl AsyncHttpClient for Offline {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        Err(HttpError::Transport(format!("network unreachable: {}", url)))
    }

    async fn get_with_headers(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, HttpError> {
        self.get(url).await
    }
}

/// Chapel at Block 3, Lot 12.
fn chapel() -> Coordinate {
    Coordinate::new(120.9531, 14.3490)
}

fn navigator(config: &ConfigFile) -> Navigator<StaticDestinationTable, Offline> {
    let table = StaticDestinationTable::new(vec![
        Destination::new(DestinationId::new("3", "12"), chapel()).with_label("Chapel"),
    ]);
    Navigator::new(
        table,
        RouteResolver::from_config(Offline, &config.to_resolver_config()),
        config.arrival.threshold_meters,
    )
}

fn write_config(dir: &TempDir, contents: &str) -> ConfigFile {
    let path = dir.path().join("config.ini");
    std::fs::write(&path, contents).unwrap();
    ConfigFile::load_from(&path).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<SmoothedEstimate>) -> Vec<SmoothedEstimate> {
    let mut out = Vec::new();
    while let Ok(estimate) = rx.try_recv() {
        out.push(estimate);
    }
    out
}

// ============================================================================
// Scheduler behavior through the config layer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_configured_threshold_controls_mode_switch() {
    let dir = TempDir::new().unwrap();
    // 12 m fixes are precise enough only with the raised threshold
    let config = write_config(&dir, "[location]\nprecision_threshold = 20\n");

    let script = r#"[
        {"fix": {"longitude": 120.9513, "latitude": 14.3478, "accuracy": 12.0}},
        {"fix": {"longitude": 120.9514, "latitude": 14.3479, "accuracy": 35.0}}
    ]"#;
    let provider = ScriptedLocationProvider::from_json(script).unwrap();
    let session = TrackingSession::start(provider.clone(), None, config.to_tracking_config());
    let mut updates = session.subscribe();

    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let modes: Vec<_> = provider.requests().iter().map(|r| r.mode).collect();
    assert_eq!(
        modes,
        vec![AcquisitionMode::HighAccuracy, AcquisitionMode::LowPower]
    );
    let sources: Vec<_> = drain(&mut updates).iter().map(|e| e.source).collect();
    assert_eq!(sources, vec![SourceTag::Precise, SourceTag::Coarse]);
}

#[tokio::test(start_paused = true)]
async fn test_configured_watch_timeout() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "[location]\nhigh_accuracy_timeout = 3\nlow_power_timeout = 2\n",
    );

    let provider = ScriptedLocationProvider::new(Vec::new());
    let session = TrackingSession::start(provider, None, config.to_tracking_config());

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(session.state(), SchedulerState::LowPower);
    assert!(session.current_estimate().is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        session.current_estimate().map(|e| e.source),
        Some(SourceTag::Default)
    );
}

#[tokio::test(start_paused = true)]
async fn test_debug_mode_from_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "[location]\ndebug = true\ndefault_longitude = 120.9531\ndefault_latitude = 14.3490\n",
    );

    let provider = ScriptedLocationProvider::new(Vec::new());
    let session = TrackingSession::start(provider.clone(), None, config.to_tracking_config());

    tokio::time::sleep(Duration::from_secs(30)).await;

    let estimate = session.current_estimate().unwrap();
    assert_eq!(estimate.source, SourceTag::Debug);
    assert_eq!(estimate.coordinate(), chapel());
    assert_eq!(session.state(), SchedulerState::HighAccuracy);
    assert!(provider.requests().is_empty());
}

// ============================================================================
// Tracking + navigation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_live_estimates_trigger_single_arrival() {
    let config = ConfigFile::default();
    let navigator = navigator(&config);
    navigator
        .set_destination(&DestinationId::new("3", "12"))
        .await
        .unwrap();

    let near = offset_meters(chapel(), 2.0, -3.0).unwrap();
    let script = format!(
        r#"[
            {{"fix": {{"longitude": {lon}, "latitude": {lat}, "accuracy": 30.0}}}},
            {{"pause": 200}},
            {{"fix": {{"longitude": {lon}, "latitude": {lat}, "accuracy": 30.0}}}},
            {{"fix": {{"longitude": {lon}, "latitude": {lat}, "accuracy": 30.0}}}}
        ]"#,
        lon = near.longitude,
        lat = near.latitude,
    );
    let provider = ScriptedLocationProvider::from_json(&script).unwrap();
    let session = TrackingSession::start(provider, None, config.to_tracking_config());
    let mut updates = session.subscribe();

    tokio::time::sleep(Duration::from_secs(6)).await;

    let statuses: Vec<_> = drain(&mut updates)
        .iter()
        .map(|estimate| navigator.check_arrival(estimate).unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec![
            ArrivalStatus::JustArrived,
            ArrivalStatus::AlreadyArrived,
            ArrivalStatus::AlreadyArrived
        ]
    );
    assert!(navigator.snapshot(session.current_estimate()).session.arrived);
}

#[tokio::test(start_paused = true)]
async fn test_no_device_still_routes_from_default_position() {
    let config = ConfigFile::default();
    let navigator = navigator(&config);

    let script = r#"[{"error": "permission_denied"}, {"error": "position_unavailable"}]"#;
    let provider = ScriptedLocationProvider::from_json(script).unwrap();
    let session = TrackingSession::start(provider, None, config.to_tracking_config());

    tokio::time::sleep(Duration::from_secs(5)).await;

    let position = session.current_estimate().expect("default position published");
    assert_eq!(position.source, SourceTag::Default);
    assert_eq!(position.coordinate(), config.default_position());

    navigator
        .set_destination(&DestinationId::new("3", "12"))
        .await
        .unwrap();
    let route = navigator.start(position.coordinate()).await.unwrap();

    assert_eq!(route.provider, RouteProvider::Fallback);
    assert_eq!(route.coordinates, vec![config.default_position(), chapel()]);

    session.stop();
    session.join().await;
    assert_eq!(session.state(), SchedulerState::Stopped);
}
