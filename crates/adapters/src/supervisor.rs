// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Supervisor (spec §4.B): spawn, stdio streaming, liveness, kill.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed { program: String, source: std::io::Error },
}

/// Static configuration for a spawned child: program, args, cwd, env
/// overlay, and a log prefix used when streaming stdio.
#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub log_prefix: String,
}

impl ProcessDescriptor {
    pub fn new(program: impl Into<PathBuf>, log_prefix: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            log_prefix: log_prefix.into(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

struct HandleState {
    expected_exit: bool,
}

/// A handle to a supervised child. `on_exit` resolves once when the process
/// terminates, carrying `(code, signal, expected)` — `expected` is true iff
/// [`Supervisor::mark_expected_exit`] was called before death was observed.
pub struct ProcessHandle {
    pub pid: u32,
    state: Arc<Mutex<HandleState>>,
    on_exit: Mutex<Option<oneshot::Receiver<ExitReport>>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub expected: bool,
}

impl ProcessHandle {
    /// Await process termination. Consumes the internal receiver; calling
    /// this more than once after the first successful await returns `None`.
    pub async fn on_exit(&self) -> Option<ExitReport> {
        let rx = self.on_exit.lock().take()?;
        rx.await.ok()
    }
}

#[derive(Default, Clone, Copy)]
pub struct Supervisor;

impl Supervisor {
    pub fn new() -> Self {
        Self
    }

    /// Spawn `descriptor` in its own process group (so [`kill`] can signal
    /// the whole tree), streaming stdout/stderr line-by-line to `tracing`
    /// with the descriptor's log prefix.
    #[allow(clippy::expect_used)]
    pub fn spawn(&self, descriptor: ProcessDescriptor) -> Result<ProcessHandle, SupervisorError> {
        let mut command = Command::new(&descriptor.program);
        command
            .args(&descriptor.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &descriptor.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &descriptor.env {
            command.env(key, value);
        }
        // New process group so a later kill() can signal the whole tree,
        // matching the leader-or-group semantics spec §4.B asks for.
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| SupervisorError::SpawnFailed {
            program: descriptor.program.display().to_string(),
            source,
        })?;
        let pid = child.id().expect("spawned child always has a pid before wait");

        if let Some(stdout) = child.stdout.take() {
            spawn_line_logger(stdout, descriptor.log_prefix.clone(), false);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_logger(stderr, descriptor.log_prefix.clone(), true);
        }

        let state = Arc::new(Mutex::new(HandleState { expected_exit: false }));
        let (tx, rx) = oneshot::channel();
        let exit_state = state.clone();
        tokio::spawn(async move {
            let report = match child.wait().await {
                Ok(status) => ExitReport {
                    code: status.code(),
                    signal: unix_signal(&status),
                    expected: exit_state.lock().expected_exit,
                },
                Err(_) => ExitReport { code: None, signal: None, expected: exit_state.lock().expected_exit },
            };
            let _ = tx.send(report);
        });

        Ok(ProcessHandle { pid, state, on_exit: Mutex::new(Some(rx)) })
    }

    /// Mark a handle's next exit as deliberate, distinguishing shutdown from
    /// crash in the eventual `on_exit` report.
    pub fn mark_expected_exit(&self, handle: &ProcessHandle) {
        handle.state.lock().expected_exit = true;
    }

    /// SIGTERM the process group (negative pid). Idempotent: an ESRCH from
    /// signaling an already-dead group is swallowed.
    pub fn kill(&self, handle: &ProcessHandle) {
        let group = Pid::from_raw(-(handle.pid as i32));
        match signal::kill(group, Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
            Err(err) => tracing::warn!(pid = handle.pid, %err, "failed to signal process group"),
        }
    }

    /// Zero-signal liveness probe.
    pub fn is_alive(&self, pid: u32) -> bool {
        signal::kill(Pid::from_raw(pid as i32), None).is_ok()
    }
}

fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

fn spawn_line_logger<R>(reader: R, prefix: String, is_stderr: bool)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if is_stderr {
                        tracing::warn!(child = %prefix, "{line}");
                    } else {
                        tracing::info!(child = %prefix, "{line}");
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(child = %prefix, %err, "stdio stream error");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
