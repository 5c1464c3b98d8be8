//! Smoke tests for the regflow CLI
//!
//! Everything here runs without a browser: argument parsing, settings
//! loading with environment overrides, and scenario validation.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SETTINGS: &str = "\
base.url: https://web.telegram.org
bot.username: reg_bot
number.phone: '+79992119999'
password: s3cret
timeouts:
  code_entry_ms: 300000
";

/// Get a command for the regflow binary with a clean environment
fn regflow() -> Command {
    let mut cmd = Command::cargo_bin("regflow").expect("regflow binary should exist");
    for var in [
        "REGFLOW_SETTINGS",
        "REGFLOW_BASE_URL",
        "REGFLOW_BOT_USERNAME",
        "REGFLOW_NUMBER_PHONE",
        "REGFLOW_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn settings_file(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("regflow.yaml");
    fs::write(&path, text).unwrap();
    path
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    regflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_lists_subcommands() {
    regflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("steps"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    regflow().assert().failure();
}

#[test]
fn test_run_help_mentions_report_dir() {
    regflow()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--report-dir"))
        .stdout(predicate::str::contains("--headless"));
}

// ============================================================================
// steps
// ============================================================================

#[test]
fn test_steps_lists_registration_journey() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, SETTINGS);

    regflow()
        .args(["steps", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("registration (14 steps)"))
        .stdout(predicate::str::contains("Find chat by tag 'reg_bot'"))
        .stdout(predicate::str::contains("14. Delete chat history"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn test_steps_applies_environment_override() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, SETTINGS);

    regflow()
        .env("REGFLOW_BOT_USERNAME", "other_bot")
        .args(["steps", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Find chat by tag 'other_bot'"));
}

#[test]
fn test_steps_rejects_out_of_order_scenario() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, SETTINGS);
    let scenario = dir.path().join("flow.yaml");
    fs::write(
        &scenario,
        "name: broken\nsteps:\n  - action: start_by_phone\n  - action: start_bot\n",
    )
    .unwrap();

    regflow()
        .args(["steps", "--settings"])
        .arg(&settings)
        .arg("--scenario")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot run on the login (phone) screen"));
}

#[test]
fn test_missing_settings_file() {
    let dir = TempDir::new().unwrap();

    regflow()
        .args(["steps", "--settings"])
        .arg(dir.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_invalid_phone_number() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, &SETTINGS.replace("+79992119999", "call me"));

    regflow()
        .args(["steps", "--settings"])
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a phone number"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_redacts_password() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, SETTINGS);

    regflow()
        .args(["config", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("\"code_entry_ms\": 300000"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn test_config_with_json_logs() {
    let dir = TempDir::new().unwrap();
    let settings = settings_file(&dir, SETTINGS);

    regflow()
        .args(["--log-json", "config", "--settings"])
        .arg(&settings)
        .assert()
        .success()
        .stdout(predicate::str::contains("https://web.telegram.org"));
}
