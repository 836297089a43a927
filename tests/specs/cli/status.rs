//! `magent status` / `magent runtimes` output rendering in both the
//! default text format and `-o json`.

use crate::support::MachineAgent;

#[test]
fn status_text_output_reports_running_and_uptime() {
    let agent = MachineAgent::start();

    let output = agent.cli().arg("status").output().expect("run magent status");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("Status: running"), "stdout: {stdout}");
    assert!(stdout.contains("Uptime:"), "stdout: {stdout}");
}

#[test]
fn runtimes_json_output_is_an_empty_array_with_no_hub_roots() {
    let agent = MachineAgent::start();

    let output = agent.cli().args(["-o", "json", "runtimes"]).output().expect("run magent runtimes");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json.as_array().expect("runtimes array").len(), 0);
}

#[test]
fn querying_an_unknown_projects_bridges_returns_an_empty_list() {
    let agent = MachineAgent::start();

    let output = agent.cli().args(["-o", "json", "bridges", "no-such-project"]).output().expect("run magent bridges");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json.as_array().expect("bridges array").len(), 0);
}

#[test]
fn ping_without_a_running_daemon_fails_with_a_nonzero_exit_code() {
    let state_dir = tempfile::TempDir::new().expect("tempdir");
    let mut cmd = assert_cmd::Command::cargo_bin("magent").expect("locate magent binary");
    cmd.env("MAGENT_STATE_DIR", state_dir.path());

    cmd.assert().failure();
}
