use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use belfry_core::{config, state, ActiveHours, Layout};

fn belfry_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("belfry"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("BELFRY_HOME")
        .env("NO_COLOR", "1");
    cmd
}

fn layout(home: &TempDir) -> Layout {
    Layout::from_home(home.path())
}

#[test]
fn send_writes_token_to_command_slot() {
    let home = TempDir::new().expect("home");

    belfry_cmd(home.path())
        .args(["send", "shutdown"])
        .assert()
        .success()
        .stdout(contains("queued 'shutdown'"));

    let slot = fs::read_to_string(layout(&home).command_path()).expect("slot");
    assert_eq!(slot.trim(), "shutdown");
}

#[test]
fn send_rejects_unknown_command() {
    let home = TempDir::new().expect("home");
    belfry_cmd(home.path())
        .args(["send", "dance"])
        .assert()
        .failure();
    assert!(!layout(&home).command_path().exists());
}

#[test]
fn belfry_home_overrides_default_root() {
    let home = TempDir::new().expect("home");
    let root = home.path().join("elsewhere");

    belfry_cmd(home.path())
        .env("BELFRY_HOME", &root)
        .args(["send", "test"])
        .assert()
        .success();

    assert!(root.join("command.txt").exists());
    assert!(!layout(&home).command_path().exists());
}

#[test]
fn status_json_reports_defaults_and_heals_config() {
    let home = TempDir::new().expect("home");

    let assert = belfry_cmd(home.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("status JSON");

    assert_eq!(report["enabled"], true);
    assert_eq!(report["volume"], 30);
    assert_eq!(report["active_hours"], "12-21");
    assert!(report["last_chimed_hour"].is_null());
    assert!(report["next_strikes"].as_u64().is_some_and(|n| (1..=12).contains(&n)));
    assert!(layout(&home).config_path().exists());
}

#[test]
fn status_table_mentions_last_chime() {
    let home = TempDir::new().expect("home");
    let layout = layout(&home);
    let mut run_state = belfry_core::RunState::default();
    run_state.record_chime(15, &chrono::Local::now());
    state::save(&layout, &run_state).expect("save state");

    belfry_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("15:00 at"))
        .stdout(contains("12-21"));
}

#[test]
fn config_edits_persist_through_store() {
    let home = TempDir::new().expect("home");
    let layout = layout(&home);

    belfry_cmd(home.path())
        .args(["config", "volume", "75", "--no-reload"])
        .assert()
        .success();
    belfry_cmd(home.path())
        .args(["config", "hours", "8,18-20", "--no-reload"])
        .assert()
        .success()
        .stdout(contains("hours=8,18-20"));
    belfry_cmd(home.path())
        .args(["config", "disable", "--no-reload"])
        .assert()
        .success()
        .stdout(contains("not queued"));

    let saved = config::load(&layout);
    assert_eq!(saved.volume.get(), 75);
    assert_eq!(saved.active_hours, ActiveHours::from_hours([8, 18, 19, 20]));
    assert!(!saved.enabled);
    assert!(!layout.command_path().exists(), "--no-reload leaves the slot alone");
}

#[test]
fn config_edit_queues_reload_by_default() {
    let home = TempDir::new().expect("home");

    belfry_cmd(home.path())
        .args(["config", "volume", "40"])
        .assert()
        .success()
        .stdout(contains("queued 'reload'"));

    let layout = layout(&home);
    assert_eq!(config::load(&layout).volume.get(), 40);
    let slot = fs::read_to_string(layout.command_path()).expect("slot");
    assert_eq!(slot.trim(), "reload");
}

#[test]
fn config_rejects_out_of_range_input() {
    let home = TempDir::new().expect("home");
    belfry_cmd(home.path())
        .args(["config", "volume", "101"])
        .assert()
        .failure();
    belfry_cmd(home.path())
        .args(["config", "hours", "20-25"])
        .assert()
        .failure()
        .stderr(contains("outside 0-23"));
}

#[test]
fn config_show_prints_normalized_json() {
    let home = TempDir::new().expect("home");
    let layout = layout(&home);
    fs::create_dir_all(layout.root()).expect("mkdir");
    fs::write(layout.config_path(), r#"{"volume": 400, "active_hours": [1]}"#).expect("write");

    let assert = belfry_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success();
    let shown: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert_eq!(shown["volume"], 100);
    assert_eq!(shown["active_hours"].as_array().map(Vec::len), Some(24));
}

#[test]
fn daemon_logs_reports_missing_files() {
    let home = TempDir::new().expect("home");
    belfry_cmd(home.path())
        .args(["daemon", "logs", "--lines", "5"])
        .assert()
        .success()
        .stdout(contains("log file not found"));
}
