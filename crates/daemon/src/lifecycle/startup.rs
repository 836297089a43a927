// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: acquire the lock, reconcile on-disk state, wire the
//! engine components together, and spawn the Host Loop and Tunnel
//! Provider as background tasks (spec §6, SPEC_FULL §10.6).

use std::time::Instant;

use fs2::FileExt;
use magent_adapters::{DesktopNotifyAdapter, NotifyAdapter};
use magent_core::SystemClock;
use magent_engine::host_loop::{ActiveProject, ActiveProjects};
use magent_engine::registry::PackagingConfig;
use magent_engine::sync_pool::{SyncPoolEvent, SyncServerSpawnConfig};
use magent_engine::tunnel::TunnelConfig;
use magent_engine::{BridgeManager, HostLoop, HostLoopConfig, Registry, SyncPool, TunnelProvider};
use magent_storage::SessionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use super::{Config, DaemonState, LifecycleError};

const CAPABILITIES: &[&str] = &["python", "node", "julia", "pty"];

/// Outcome of a successful startup: the long-lived daemon state plus a raw
/// accept loop the caller (the binary's `main`) drives.
pub struct StartupResult {
    pub daemon: DaemonState,
}

pub async fn startup(config: Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(err) => Err(err),
    }
}

async fn startup_inner(config: Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;
    std::fs::create_dir_all(&config.sessions_dir)?;

    // Acquire the lock before touching anything else owned by a running
    // daemon — an already-running `magentd` on this state dir must win.
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| LifecycleError::LockFailed(config.lock_path.clone()))?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    info!(state_dir = %config.state_dir.display(), machine_id = %config.machine_id, "starting machine agent");

    let clock = SystemClock;
    let store = SessionStore::new(&config.sessions_dir);
    let registry = Arc::new(Registry::new(store, PackagingConfig { packaged: false, bundle_dir: config.state_dir.clone() }, clock.clone()));
    registry.reconcile();

    let sync_pool = Arc::new(SyncPool::new(
        std::env::temp_dir(),
        SyncServerSpawnConfig::new(config.sync_server_binary.clone()),
        clock.clone(),
    ));

    let bridges = BridgeManager::new(clock.clone());
    bridges.spawn_idle_sweeper();

    let notify_task = spawn_death_notifier(sync_pool.subscribe());

    let active_projects: ActiveProjects = Arc::new(Mutex::new(HashMap::<String, ActiveProject>::new()));

    let host_loop_config = HostLoopConfig {
        cloud_url: config.cloud_url.clone(),
        hub_roots: config.hub_roots.clone(),
        user_id: config.user_id.clone(),
        token: config.token.clone(),
        machine_id: config.machine_id.clone(),
        machine_name: config.machine_name.clone(),
        hostname: config.hostname.clone(),
        capabilities: CAPABILITIES.iter().map(|s| s.to_string()).collect(),
        scan_interval: config.rescan_interval,
    };
    let host_loop = HostLoop::new(host_loop_config, Arc::clone(&sync_pool), Arc::clone(&active_projects));
    let host_loop_task = tokio::spawn(Arc::clone(&host_loop).run());

    let tunnel_config = TunnelConfig {
        relay_base_ws: config.cloud_ws_url.clone(),
        relay_base_http: config.cloud_url.clone(),
        user_id: config.user_id.clone(),
        token: config.token.clone(),
        machine_id: config.machine_id.clone(),
        machine_name: config.machine_name.clone(),
        hostname: config.hostname.clone(),
        capabilities: CAPABILITIES.iter().map(|s| s.to_string()).collect(),
    };
    let tunnel = TunnelProvider::new(tunnel_config, Arc::clone(&registry), Arc::clone(&bridges), Arc::clone(&active_projects));
    let tunnel_task = tokio::spawn(Arc::clone(&tunnel).run());

    let daemon = DaemonState {
        config,
        lock_file,
        started_at: Instant::now(),
        registry,
        sync_pool,
        bridges,
        active_projects,
        host_loop,
        tunnel,
        host_loop_task,
        tunnel_task,
        notify_task,
    };

    Ok(StartupResult { daemon })
}

/// spec §1.5/§4.D.5/§7: a supervised sync server dying unexpectedly must
/// produce a user-visible signal, not just a log line. Forwards every
/// `SyncPoolEvent::Died` on the pool's broadcast stream to a desktop
/// notification.
fn spawn_death_notifier(mut events: tokio::sync::broadcast::Receiver<SyncPoolEvent>) -> tokio::task::JoinHandle<()> {
    let notifier = DesktopNotifyAdapter::new();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncPoolEvent::Died { project_dir, reason, .. }) => {
                    let title = format!("Sync server stopped: {}", project_dir.display());
                    if let Err(err) = notifier.notify(&title, &reason).await {
                        tracing::warn!(%err, "failed to deliver sync server death notification");
                    }
                }
                Ok(SyncPoolEvent::Released { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
