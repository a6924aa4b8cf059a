//! CLI integration tests
//!
//! Tests the behavior of both binaries without reaching the network.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::helpers::config_file;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
[credentials]
id = "user@example.com"
password = "hunter2"

[server]
bind = "127.0.0.1:0"
api_key = "integration-key"
"#;

#[test]
fn test_version_flag() {
    let mut server = cargo_bin_cmd!("qr-checkin");
    server
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    let mut generate = cargo_bin_cmd!("qr-checkin-generate");
    generate
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_server_help_flag() {
    let mut cmd = cargo_bin_cmd!("qr-checkin");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_generate_help_flag() {
    let mut cmd = cargo_bin_cmd!("qr-checkin-generate");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--png"))
        .stdout(predicate::str::contains("--size"));
}

#[test]
fn test_missing_config_file_fails() {
    let mut server = cargo_bin_cmd!("qr-checkin");
    server
        .args(["--config", "/nonexistent/qr-checkin/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));

    let mut generate = cargo_bin_cmd!("qr-checkin-generate");
    generate
        .args(["--config", "/nonexistent/qr-checkin/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_incomplete_config_fails_validation() {
    let file = config_file(".toml", "[server]\napi_key = \"k\"\n");

    let mut cmd = cargo_bin_cmd!("qr-checkin");
    cmd.arg("--config").arg(file.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_no_config_anywhere_fails_validation() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("qr-checkin-generate");
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_generate_rejects_size_out_of_range() {
    let file = config_file(".toml", VALID_CONFIG);

    let mut cmd = cargo_bin_cmd!("qr-checkin-generate");
    cmd.arg("--config")
        .arg(file.path())
        .args(["--png", "qr.png", "--size", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("outside"));
}
