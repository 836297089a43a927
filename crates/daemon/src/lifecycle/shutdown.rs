// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown (spec §6, SPEC_FULL §10.6): stop the Host Loop, tear
//! down every Document Bridge and the Tunnel Provider, and mark every
//! owned sync server expected-exit before the process returns its exit
//! code.

use tracing::info;

use super::DaemonState;

/// Stop every background subsystem in dependency order: the Host Loop
/// first (so it stops acquiring new sync servers), then the tunnel (so no
/// new `bridge-request` arrives), then every bridge, then release every
/// project the Host Loop was holding a reference to.
pub async fn shutdown(daemon: DaemonState) {
    info!("shutting down machine agent");

    daemon.host_loop.stop();
    daemon.tunnel.stop();

    for project in daemon.active_projects.lock().keys().cloned().collect::<Vec<_>>() {
        daemon.bridges.stop_project(&project);
    }

    daemon.host_loop_task.abort();
    daemon.tunnel_task.abort();
    daemon.notify_task.abort();

    info!("machine agent stopped");
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
