// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local admin IPC listener (SPEC_FULL §10.6): a Unix domain socket that
//! answers `magent` CLI requests for daemon status, the runtime/bridge
//! tables, and graceful shutdown.

use std::sync::Arc;
use std::time::Instant;

use magent_core::SystemClock;
use magent_engine::host_loop::ActiveProjects;
use magent_engine::{BridgeManager, Registry};
use magent_wire::{read_request, write_response, AdminRequest, AdminResponse, ProjectAdminSummary, RuntimeAdminSummary};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::lifecycle::DaemonState;

/// The subset of daemon state the admin listener needs to answer queries,
/// held by `Arc` reference rather than taking ownership of [`DaemonState`]
/// itself — `main` keeps the daemon state and shuts its subsystems down
/// directly once the listener task has been stopped, with no handoff of
/// ownership across the listener's own `Arc` boundary to unwind.
pub struct AdminContext {
    pub started_at: Instant,
    pub registry: Arc<Registry<SystemClock>>,
    pub bridges: Arc<BridgeManager<SystemClock>>,
    pub active_projects: ActiveProjects,
}

impl AdminContext {
    pub fn from_daemon(daemon: &DaemonState) -> Self {
        Self {
            started_at: daemon.started_at,
            registry: Arc::clone(&daemon.registry),
            bridges: Arc::clone(&daemon.bridges),
            active_projects: Arc::clone(&daemon.active_projects),
        }
    }
}

/// Bind the admin socket, removing any stale file left by a prior run
/// (the lock file, not this socket, is what actually prevents a double
/// start — see `lifecycle::startup`).
pub fn bind(socket_path: &std::path::Path) -> std::io::Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    UnixListener::bind(socket_path)
}

/// Accept connections until `shutdown` is notified. Each connection is
/// handled to completion (or disconnect) before the next is accepted —
/// the admin protocol is request/response and low-volume, so a
/// one-at-a-time accept loop keeps this simple rather than spawning a task
/// per connection.
pub async fn run(listener: UnixListener, daemon: Arc<AdminContext>, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let daemon = Arc::clone(&daemon);
                        let shutdown = Arc::clone(&shutdown);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, daemon, shutdown).await {
                                warn!(%err, "admin connection ended with an error");
                            }
                        });
                    }
                    Err(err) => warn!(%err, "failed to accept admin connection"),
                }
            }
            _ = shutdown.notified() => {
                info!("admin listener stopping");
                return;
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    daemon: Arc<AdminContext>,
    shutdown: Arc<Notify>,
) -> Result<(), magent_wire::ProtocolError> {
    loop {
        let request: AdminRequest = match read_request(&mut stream).await {
            Ok(request) => request,
            Err(magent_wire::ProtocolError::Io(_)) => return Ok(()), // client disconnected
            Err(err) => return Err(err),
        };
        let response = handle_request(&daemon, &shutdown, request);
        let is_shutdown = matches!(response, AdminResponse::ShuttingDown);
        write_response(&mut stream, &response).await?;
        if is_shutdown {
            return Ok(());
        }
    }
}

fn handle_request(daemon: &AdminContext, shutdown: &Notify, request: AdminRequest) -> AdminResponse {
    match request {
        AdminRequest::Ping => AdminResponse::Pong { version: env!("CARGO_PKG_VERSION").to_string() },
        AdminRequest::Status => {
            let active_projects = daemon.active_projects.lock();
            let projects = active_projects
                .iter()
                .map(|(name, project)| ProjectAdminSummary {
                    name: name.clone(),
                    sync_port: Some(project.sync_port),
                    bridge_count: daemon.bridges.statuses(name).len(),
                    runtime_count: daemon.registry.list(None).iter().filter(|s| s.name.starts_with(&format!("{name}-"))).count(),
                })
                .collect();
            AdminResponse::Status { uptime_secs: daemon.started_at.elapsed().as_secs(), projects }
        }
        AdminRequest::ListRuntimes { project } => {
            let runtimes = daemon
                .registry
                .list(None)
                .into_iter()
                .filter(|session| project.as_deref().is_none_or(|p| session.name.starts_with(&format!("{p}-"))))
                .map(|session| RuntimeAdminSummary {
                    name: session.name.clone(),
                    language: session.language.as_str().to_string(),
                    pid: session.pid,
                    port: session.port,
                    alive: session.alive,
                })
                .collect();
            AdminResponse::Runtimes { runtimes }
        }
        AdminRequest::ListBridges { project } => AdminResponse::Bridges { bridges: daemon.bridges.statuses(&project) },
        AdminRequest::Shutdown => {
            // `notify_waiters`, not `notify_one`: both the listener's own
            // accept loop and `magentd::main`'s signal-wait select are
            // already registered as waiters on this same `Notify` by the
            // time a CLI-issued shutdown can arrive, and both need to wake.
            shutdown.notify_waiters();
            AdminResponse::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
