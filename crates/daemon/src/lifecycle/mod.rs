// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, wiring, and graceful shutdown
//! (spec §6, SPEC_FULL §10.6).

mod shutdown;
mod startup;

pub use shutdown::shutdown;
pub use startup::{startup, StartupResult};

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use magent_core::{MachineId, SystemClock};
use magent_engine::host_loop::ActiveProjects;
use magent_engine::{BridgeManager, HostLoop, Registry, SyncPool, TunnelProvider};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory: $HOME is unset")]
    NoStateDir,
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("another magentd already holds the lock at {0}")]
    LockFailed(PathBuf),
    #[error("failed to bind admin socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Settings(#[from] magent_storage::SettingsError),
}

/// Daemon configuration, resolved once at startup from the environment
/// (spec §6) and the read-only settings file.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_dir: PathBuf,
    pub sessions_dir: PathBuf,

    pub cloud_url: String,
    pub cloud_ws_url: String,
    pub hub_roots: Vec<PathBuf>,
    pub machine_id: MachineId,
    pub machine_name: String,
    pub hostname: String,
    pub rescan_interval: std::time::Duration,
    pub sync_server_binary: PathBuf,
    pub user_id: String,
    pub token: String,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        let settings = magent_storage::Settings::load(&crate::env::settings_path(&state_dir))?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_dir: state_dir.join("logs"),
            sessions_dir: state_dir.join("sessions"),
            cloud_url: crate::env::cloud_url()?,
            cloud_ws_url: crate::env::cloud_ws_url()?,
            hub_roots: crate::env::hub_roots(),
            machine_id: MachineId::new(crate::env::machine_id()),
            machine_name: crate::env::machine_name(),
            hostname: crate::env::hostname_string(),
            rescan_interval: crate::env::rescan_interval(),
            sync_server_binary: crate::env::sync_server_binary(),
            user_id: settings.user_id,
            token: settings.token,
            state_dir,
        })
    }
}

/// Everything a running daemon holds, handed from `startup` to the signal
/// handler and the admin listener.
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)] // held only to keep the exclusive file lock alive
    lock_file: File,
    pub started_at: Instant,
    pub registry: Arc<Registry<SystemClock>>,
    pub sync_pool: Arc<SyncPool<SystemClock>>,
    pub bridges: Arc<BridgeManager<SystemClock>>,
    pub active_projects: ActiveProjects,
    pub host_loop: Arc<HostLoop<SystemClock>>,
    pub tunnel: Arc<TunnelProvider<SystemClock>>,
    pub host_loop_task: JoinHandle<()>,
    pub tunnel_task: JoinHandle<()>,
    /// Forwards `SyncPoolEvent::Died` to a user-visible desktop notification
    /// (spec §1.5, §4.D.5, §7 — the primary data-loss-prevention signal).
    pub notify_task: JoinHandle<()>,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
