//! Daemon process lifecycle: startup, admin socket handshake, single-
//! instance locking, and graceful shutdown via the `magent` CLI.

use crate::support::{wait_for, MachineAgent};
use assert_cmd::cargo::CommandCargoExt;
use std::process::{Command, Stdio};
use std::time::Duration;

#[test]
fn ping_reaches_a_freshly_started_daemon() {
    let agent = MachineAgent::start();

    let output = agent.cli().arg("ping").output().expect("run magent ping");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("magentd"), "expected version banner, got: {stdout}");
}

#[test]
fn status_reports_zero_active_projects_on_a_fresh_daemon() {
    let agent = MachineAgent::start();

    let output = agent.cli().args(["-o", "json", "status"]).output().expect("run magent status");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["status"], "running");
    assert_eq!(json["projects"].as_array().expect("projects array").len(), 0);
}

#[test]
fn stop_command_shuts_the_daemon_down_gracefully() {
    let mut agent = MachineAgent::start();

    agent.cli().arg("stop").assert().success();

    let exited = wait_for(Duration::from_secs(5), || !agent.is_running());
    assert!(exited, "daemon should have exited after `magent stop`");
}

#[test]
fn a_second_daemon_on_the_same_state_dir_refuses_to_start() {
    let agent = MachineAgent::start();

    let mut second = Command::cargo_bin("magentd").expect("locate magentd binary");
    second
        .env("MAGENT_STATE_DIR", agent.state_dir())
        .env("MARKCO_CLOUD_URL", "https://relay.invalid")
        .env("MRMD_MACHINE_HUB_ROOTS", "")
        .env("MRMD_MACHINE_ID", "spec-machine")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = second.status().expect("run second magentd");
    assert_eq!(status.code(), Some(2), "second daemon should exit 2 when the lock is already held");
}
