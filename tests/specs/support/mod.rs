//! Fixtures shared by the workspace integration specs: spawning a real
//! `magentd` against a throwaway state directory, and driving it through
//! the `magent` CLI binary.

use assert_cmd::cargo::CommandCargoExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A running `magentd` process rooted at its own throwaway state directory.
/// Killed on drop so a panicking assertion never leaks a daemon.
pub struct MachineAgent {
    state_dir: TempDir,
    child: Child,
}

impl MachineAgent {
    /// Start a daemon pointed at an unreachable relay — fine for specs that
    /// only exercise the admin socket, since the host loop and tunnel
    /// reconnect in the background rather than blocking startup.
    pub fn start() -> Self {
        Self::start_with_cloud_url("https://relay.invalid")
    }

    pub fn start_with_cloud_url(cloud_url: &str) -> Self {
        let state_dir = TempDir::new().expect("create state dir");
        std::fs::write(state_dir.path().join("settings.json"), r#"{"userId":"spec-user","token":"spec-token"}"#)
            .expect("write settings.json");

        let mut command = Command::cargo_bin("magentd").expect("locate magentd binary");
        command
            .env("MAGENT_STATE_DIR", state_dir.path())
            .env("MARKCO_CLOUD_URL", cloud_url)
            .env("MRMD_MACHINE_HUB_ROOTS", "")
            .env("MRMD_MACHINE_ID", "spec-machine")
            .env("RUST_LOG", "error")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().expect("spawn magentd");
        let agent = Self { state_dir, child };
        agent.wait_for_socket();
        agent
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("daemon.sock")
    }

    pub fn state_dir(&self) -> &std::path::Path {
        self.state_dir.path()
    }

    fn wait_for_socket(&self) {
        let ready = wait_for(Duration::from_secs(5), || self.socket_path().exists());
        assert!(ready, "magentd did not bind its admin socket in time");
    }

    /// Whether the daemon process is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Build a `magent` CLI invocation pointed at this daemon's state dir.
    pub fn cli(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("magent").expect("locate magent binary");
        cmd.env("MAGENT_STATE_DIR", self.state_dir.path());
        cmd
    }
}

impl Drop for MachineAgent {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll `check` every 20ms until it returns true or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
