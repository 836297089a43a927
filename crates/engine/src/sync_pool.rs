// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync Server Pool (spec §4.D): per-project reference-counted supervised
//! sync servers. Discovers pre-existing instances via on-disk PID+port
//! markers, verifies port liveness before trusting them, and publishes a
//! data-loss-prevention event when a supervised server dies unexpectedly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use magent_adapters::{ProcessDescriptor, ProcessHandle, Supervisor};
use magent_core::sync_server::SyncServerMarker;
use magent_core::{Clock, SyncServer};
use magent_storage::{delete_marker, read_marker, write_marker, MarkerError};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum SyncPoolError {
    #[error(transparent)]
    PortBroker(#[from] magent_adapters::PortBrokerError),
    #[error(transparent)]
    Spawn(#[from] magent_adapters::SupervisorError),
    #[error(transparent)]
    Marker(#[from] MarkerError),
}

/// Configuration for spawning a fresh sync server child (spec §4.D.4): a
/// hard memory ceiling and per-server/per-document connection caps, passed
/// through as the child's own startup flags since the sync server's
/// internals are opaque to this agent.
#[derive(Debug, Clone)]
pub struct SyncServerSpawnConfig {
    pub binary: PathBuf,
    pub memory_cap_mb: u64,
    pub max_connections_per_server: u32,
    pub max_connections_per_document: u32,
    pub startup_timeout: Duration,
}

impl SyncServerSpawnConfig {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            memory_cap_mb: 512,
            max_connections_per_server: 256,
            max_connections_per_document: 32,
            startup_timeout: Duration::from_secs(10),
        }
    }
}

/// Observable pool events — the Document Bridge layer and UI notification
/// channel both subscribe to the same broadcast stream (spec §4.D, §7).
#[derive(Debug, Clone)]
pub enum SyncPoolEvent {
    /// A supervised sync server exited without a prior `release()` marking
    /// it expected — the primary data-loss-prevention signal.
    Died {
        project_dir: PathBuf,
        exit_code: Option<i32>,
        signal: Option<i32>,
        reason: String,
        timestamp_ms: u64,
    },
    /// A project's last reference was released. Bridges for this project
    /// must stop regardless of whether the process itself was torn down —
    /// an adopted server stays alive at refcount zero.
    Released { project_dir: PathBuf },
}

struct PoolEntry {
    server: SyncServer,
    handle: Option<Arc<ProcessHandle>>,
}

pub struct SyncPool<C: Clock + 'static> {
    supervisor: Supervisor,
    tmp_dir: PathBuf,
    spawn_config: SyncServerSpawnConfig,
    clock: C,
    entries: Arc<Mutex<HashMap<PathBuf, PoolEntry>>>,
    events: broadcast::Sender<SyncPoolEvent>,
}

fn canonical(project_dir: &Path) -> PathBuf {
    std::fs::canonicalize(project_dir).unwrap_or_else(|_| project_dir.to_path_buf())
}

impl<C: Clock + 'static> SyncPool<C> {
    pub fn new(tmp_dir: impl Into<PathBuf>, spawn_config: SyncServerSpawnConfig, clock: C) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            supervisor: Supervisor::new(),
            tmp_dir: tmp_dir.into(),
            spawn_config,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncPoolEvent> {
        self.events.subscribe()
    }

    /// Number of distinct projects currently tracked — used by tests to
    /// assert the pool invariant (spec §8.1: balanced acquire/release
    /// leaves zero entries for a project).
    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// spec §4.D.1-4.
    pub async fn acquire(&self, project_dir: &Path) -> Result<SyncServer, SyncPoolError> {
        let key = canonical(project_dir);

        if let Some(entry) = self.entries.lock().get_mut(&key) {
            entry.server.acquire();
            return Ok(entry.server.clone());
        }

        if let Some(marker) = read_marker(&self.tmp_dir, &key)? {
            let pid_alive = self.supervisor.is_alive(marker.pid);
            let port_listening =
                magent_adapters::is_listening(marker.port, magent_adapters::localhost()).await;
            if pid_alive && port_listening {
                let server = SyncServer::adopted(key.clone(), marker.port, marker.pid);
                self.entries.lock().insert(key, PoolEntry { server: server.clone(), handle: None });
                return Ok(server);
            }
            // AdoptionStale (spec §7): dead PID or an idle port. Either
            // way the marker no longer points at a trustworthy process.
            delete_marker(&self.tmp_dir, &key)?;
        }

        self.spawn_fresh(key).await
    }

    async fn spawn_fresh(&self, key: PathBuf) -> Result<SyncServer, SyncPoolError> {
        let port = magent_adapters::allocate().await?;
        let descriptor = ProcessDescriptor::new(
            self.spawn_config.binary.clone(),
            format!("sync:{}", key.display()),
        )
        .with_arg("--port")
        .with_arg(port.to_string())
        .with_arg("--dir")
        .with_arg(key.display().to_string())
        .with_arg("--memory-cap-mb")
        .with_arg(self.spawn_config.memory_cap_mb.to_string())
        .with_arg("--max-connections")
        .with_arg(self.spawn_config.max_connections_per_server.to_string())
        .with_arg("--max-connections-per-document")
        .with_arg(self.spawn_config.max_connections_per_document.to_string());

        let handle = Arc::new(self.supervisor.spawn(descriptor)?);
        if let Err(err) =
            magent_adapters::wait_for_listening(port, self.spawn_config.startup_timeout, magent_adapters::localhost())
                .await
        {
            self.supervisor.mark_expected_exit(&handle);
            self.supervisor.kill(&handle);
            return Err(err.into());
        }

        write_marker(&self.tmp_dir, &key, SyncServerMarker { pid: handle.pid, port })?;

        let server = SyncServer::owned(key.clone(), port, handle.pid);
        self.entries
            .lock()
            .insert(key.clone(), PoolEntry { server: server.clone(), handle: Some(Arc::clone(&handle)) });

        self.spawn_exit_watcher(key, Arc::clone(&handle));

        Ok(server)
    }

    fn spawn_exit_watcher(&self, key: PathBuf, handle: Arc<ProcessHandle>) {
        let entries = Arc::clone(&self.entries);
        let events = self.events.clone();
        let clock = self.clock.clone();
        let tmp_dir = self.tmp_dir.clone();
        tokio::spawn(async move {
            let Some(report) = handle.on_exit().await else { return };
            if report.expected {
                // release() already removed the entry and the marker.
                return;
            }
            let still_ours = entries.lock().remove(&key).is_some();
            if !still_ours {
                return;
            }
            let _ = delete_marker(&tmp_dir, &key);
            let reason = match report.signal {
                Some(sig) => format!("sync server crashed (signal {sig})"),
                None => format!("sync server crashed (exit code {:?})", report.code),
            };
            let _ = events.send(SyncPoolEvent::Died {
                project_dir: key,
                exit_code: report.code,
                signal: report.signal,
                reason,
                timestamp_ms: clock.epoch_ms(),
            });
        });
    }

    /// spec §4.D `release`: decrement refcount. When it hits zero the pool
    /// entry is removed regardless of ownership (§8.1: balanced
    /// acquire/release leaves zero entries for a project); the process
    /// itself is only killed when we own it — an adopted server keeps
    /// running for whichever instance actually spawned it. Either way,
    /// notify observers so every bridge for this project stops.
    pub fn release(&self, project_dir: &Path) {
        let key = canonical(project_dir);
        let teardown = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&key) {
                Some(entry) => {
                    if entry.server.release() {
                        let handle = entry.handle.clone();
                        entries.remove(&key);
                        handle
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(handle) = teardown {
            self.supervisor.mark_expected_exit(&handle);
            self.supervisor.kill(&handle);
            let _ = delete_marker(&self.tmp_dir, &key);
        }
        let _ = self.events.send(SyncPoolEvent::Released { project_dir: key });
    }
}

#[cfg(test)]
#[path = "sync_pool_tests.rs"]
mod tests;
