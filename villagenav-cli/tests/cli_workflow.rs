//! Integration tests for the villagenav binary.
//!
//! Each test runs the CLI with `HOME` pointed at a temporary directory, so
//! the config file and log file never touch the real home directory.
//! Routing services are configured on a closed local port, which exercises
//! the offline straight-line fallback without network access.
//!
//! Run with: `cargo test -p villagenav-cli --test cli_workflow`

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Nothing listens here; connections are refused immediately.
const CLOSED_PORT_URL: &str = "http://127.0.0.1:9";

fn run_cli(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_villagenav"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command")
}

fn assert_success(output: &Output, context: &str) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!("{} failed:\nstdout: {}\nstderr: {}", context, stdout, stderr);
    }
}

fn config_path(home: &Path) -> PathBuf {
    home.join(".villagenav").join("config.ini")
}

/// Write a config that keeps every request on the local machine.
fn write_offline_config(home: &Path, extra: &str) {
    let path = config_path(home);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        format!(
            "[routing]\nosrm_url = {url}\nors_url = {url}\nosrm_timeout = 2\n\n{extra}",
            url = CLOSED_PORT_URL,
            extra = extra
        ),
    )
    .unwrap();
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

#[test]
fn test_config_init_and_path() {
    let home = TempDir::new().unwrap();

    let output = run_cli(home.path(), &["config", "path"]);
    assert_success(&output, "config path");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        config_path(home.path()).display().to_string()
    );

    let output = run_cli(home.path(), &["config", "init"]);
    assert_success(&output, "config init");
    let written = std::fs::read_to_string(config_path(home.path())).unwrap();
    assert!(written.contains("[location]"));
    assert!(written.contains("[destinations]"));

    // A second init refuses to overwrite
    let output = run_cli(home.path(), &["config", "init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = run_cli(home.path(), &["config", "init", "--force"]);
    assert_success(&output, "config init --force");
}

#[test]
fn test_config_show_masks_keys() {
    let home = TempDir::new().unwrap();
    write_offline_config(home.path(), "[destinations]\napi_key = supersecretkey\n");

    let output = run_cli(home.path(), &["config", "show"]);
    assert_success(&output, "config show");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("****tkey"));
    assert!(!stdout.contains("supersecretkey"));
}

#[test]
fn test_invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    write_offline_config(home.path(), "[arrival]\nthreshold = far\n");

    let output = run_cli(home.path(), &["route", "--to", "120.9531,14.3490"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("arrival.threshold"));
}

#[test]
fn test_route_offline_falls_back_to_straight_line() {
    let home = TempDir::new().unwrap();
    write_offline_config(home.path(), "");

    let output = run_cli(
        home.path(),
        &[
            "route",
            "--from",
            "120.9513,14.3478",
            "--to",
            "120.9531,14.3490",
            "--json",
        ],
    );
    assert_success(&output, "route");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    let route = &lines[0];
    assert_eq!(route["provider"], "fallback");
    assert_eq!(route["coordinates"].as_array().unwrap().len(), 2);
    assert_eq!(route["coordinates"][1]["longitude"], 120.9531);
}

#[test]
fn test_locate_from_local_table() {
    let home = TempDir::new().unwrap();
    let table = home.path().join("lots.json");
    std::fs::write(
        &table,
        r#"[{"block": "3", "lot": 12, "longitude": 120.9531, "latitude": 14.3490, "label": "Chapel"}]"#,
    )
    .unwrap();
    write_offline_config(
        home.path(),
        &format!("[destinations]\ntable = {}\n", table.display()),
    );

    let output = run_cli(home.path(), &["locate", "--block", "3", "--lot", "12", "--json"]);
    assert_success(&output, "locate");
    let destination = &json_lines(&output)[0];
    assert_eq!(destination["label"], "Chapel");
    assert_eq!(destination["coordinates"]["latitude"], 14.349);

    let output = run_cli(home.path(), &["locate", "--block", "3", "--lot", "13"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Block 3, Lot 13 not found"));
}

#[test]
fn test_simulate_reports_arrival_once() {
    let home = TempDir::new().unwrap();
    write_offline_config(home.path(), "");

    let fixes = home.path().join("walk.json");
    std::fs::write(
        &fixes,
        r#"[
            {"fix": {"longitude": 120.95312, "latitude": 14.34902, "accuracy": 30.0}},
            {"fix": {"longitude": 120.95312, "latitude": 14.34902, "accuracy": 30.0}},
            {"fix": {"longitude": 120.95312, "latitude": 14.34902, "accuracy": 30.0}}
        ]"#,
    )
    .unwrap();

    let output = run_cli(
        home.path(),
        &[
            "simulate",
            "--fixes",
            fixes.to_str().unwrap(),
            "--to",
            "120.9531,14.3490",
            "--interval-ms",
            "20",
            "--linger-secs",
            "1",
            "--json",
        ],
    );
    assert_success(&output, "simulate");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 3);
    let statuses: Vec<_> = lines
        .iter()
        .map(|line| line["arrival"]["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        statuses,
        vec!["just_arrived", "already_arrived", "already_arrived"]
    );
    // The first fix arrives while acquiring at high accuracy
    assert_eq!(lines[0]["estimate"]["source"], "precise");
}

#[test]
fn test_simulate_rejects_missing_script() {
    let home = TempDir::new().unwrap();
    write_offline_config(home.path(), "");

    let output = run_cli(
        home.path(),
        &["simulate", "--fixes", "/nonexistent/walk.json"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("fix script"));
}
