// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document Bridge (spec §4.E): couples a local sync-server WebSocket and a
//! remote relay WebSocket for one document, forwarding opaque frames in
//! both directions with pre-ready buffering, reconnect backoff+jitter, and
//! the replay-protection guard that keeps a reconnecting remote peer from
//! clobbering local state with a stale bulk-sync dump.
//!
//! [`Bridge`] drives one document's pair of sockets. [`BridgeManager`] owns
//! the collection of bridges for the whole agent: the staggered-start
//! queue (spec §4.E "avoid thundering herd"), idempotent `ensure_bridge`,
//! and the once-a-minute idle-teardown sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use magent_core::bridge::BridgeSide;
use magent_core::{reconnect_delay_ms, should_forward_remote_frame, BridgeStatus, Clock, ReplayGuard};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;

/// How long a fully-connected bridge may sit with no forwarded message
/// before the idle sweep tears it down (spec §4.E).
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Cadence of the idle-teardown sweep.
pub const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Staggered-start batch size and inter-batch pause (spec §4.E).
pub const START_BATCH_SIZE: usize = 8;
pub const START_BATCH_PAUSE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub doc_name: String,
    pub local_url: String,
    pub remote_url: String,
    pub bearer_token: String,
}

struct Inner {
    local: BridgeSide,
    remote: BridgeSide,
    guard: ReplayGuard,
    status: BridgeStatus,
    local_tx: Option<mpsc::UnboundedSender<(Vec<u8>, bool)>>,
    remote_tx: Option<mpsc::UnboundedSender<(Vec<u8>, bool)>>,
}

/// One document's pair of coupled WebSocket connections.
pub struct Bridge<C: Clock + 'static> {
    config: BridgeConfig,
    clock: C,
    destroyed: Arc<AtomicBool>,
    state: Arc<Mutex<Inner>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[allow(clippy::expect_used)]
async fn connect_with_bearer(
    url: &str,
    bearer_token: &str,
) -> Result<(WsStream, tokio_tungstenite::tungstenite::handshake::client::Response), tokio_tungstenite::tungstenite::Error>
{
    let mut request = url.into_client_request()?;
    let value = format!("Bearer {bearer_token}");
    request
        .headers_mut()
        .insert(AUTHORIZATION, value.parse().expect("bearer header value is valid ASCII"));
    tokio_tungstenite::connect_async(request).await
}

fn to_message(data: Vec<u8>, is_binary: bool) -> Message {
    if is_binary {
        Message::Binary(data)
    } else {
        Message::Text(String::from_utf8_lossy(&data).into_owned())
    }
}

impl<C: Clock + 'static> Bridge<C> {
    pub fn new(config: BridgeConfig, clock: C) -> Arc<Self> {
        let started_at = clock.epoch_ms();
        Arc::new(Self {
            state: Arc::new(Mutex::new(Inner {
                local: BridgeSide::default(),
                remote: BridgeSide::default(),
                guard: ReplayGuard::default(),
                status: BridgeStatus::new(config.doc_name.clone(), started_at),
                local_tx: None,
                remote_tx: None,
            })),
            config,
            clock,
            destroyed: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn status(&self) -> BridgeStatus {
        self.state.lock().status.clone()
    }

    /// Spawn both sides' reconnect loops. Idempotent if the bridge was
    /// already destroyed before its turn came up in the start queue (spec
    /// §4.E Design Notes: "queue items are idempotent starts").
    pub fn start(self: &Arc<Self>) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let local = Arc::clone(self);
        let local_task = tokio::spawn(async move { local.run_local_loop().await });
        let remote = Arc::clone(self);
        let remote_task = tokio::spawn(async move { remote.run_remote_loop().await });
        self.tasks.lock().extend([local_task, remote_task]);
    }

    /// spec §4.E `stop`: mark destroyed, cancel timers/tasks, close both
    /// sockets. Idempotent.
    pub fn stop(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        let mut inner = self.state.lock();
        inner.local.mark_closed();
        inner.remote.mark_closed();
        inner.local.pending.clear();
        inner.remote.pending.clear();
        inner.status.connected = false;
        inner.status.reconnecting = false;
    }

    fn forward_to_remote(&self, data: Vec<u8>, is_binary: bool) {
        let mut inner = self.state.lock();
        inner.status.last_message_at = Some(self.clock.epoch_ms());
        if inner.remote.ready {
            if let Some(tx) = inner.remote_tx.clone() {
                let _ = tx.send((data, is_binary));
            }
        } else {
            inner.remote.enqueue(data, is_binary);
        }
    }

    fn forward_to_local(&self, data: Vec<u8>, is_binary: bool) {
        let mut inner = self.state.lock();
        if !should_forward_remote_frame(&data, is_binary, &mut inner.guard) {
            return;
        }
        inner.status.last_message_at = Some(self.clock.epoch_ms());
        if inner.local.ready {
            if let Some(tx) = inner.local_tx.clone() {
                let _ = tx.send((data, is_binary));
            }
        } else {
            inner.local.enqueue(data, is_binary);
        }
    }

    async fn run_local_loop(self: Arc<Self>) {
        loop {
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            match tokio_tungstenite::connect_async(self.config.local_url.clone()).await {
                Ok((stream, _)) => {
                    let (mut write, mut read) = stream.split();
                    let (tx, mut rx) = mpsc::unbounded_channel::<(Vec<u8>, bool)>();
                    let pending = {
                        let mut inner = self.state.lock();
                        inner.local_tx = Some(tx);
                        inner.status.local_ready = true;
                        inner.status.reconnecting = false;
                        inner.status.connected = inner.status.remote_ready;
                        inner.local.mark_open()
                    };
                    for (data, is_binary) in pending {
                        let _ = write.send(to_message(data, is_binary)).await;
                    }
                    let writer = tokio::spawn(async move {
                        while let Some((data, is_binary)) = rx.recv().await {
                            if write.send(to_message(data, is_binary)).await.is_err() {
                                break;
                            }
                        }
                    });
                    while let Some(message) = read.next().await {
                        match message {
                            Ok(Message::Binary(data)) => self.forward_to_remote(data, true),
                            Ok(Message::Text(text)) => self.forward_to_remote(text.into_bytes(), false),
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(_) => break,
                        }
                    }
                    writer.abort();
                }
                Err(err) => {
                    self.state.lock().status.last_error = Some(err.to_string());
                }
            }
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            let attempt = {
                let mut inner = self.state.lock();
                inner.local.mark_closed();
                inner.local_tx = None;
                inner.status.local_ready = false;
                inner.status.connected = false;
                inner.status.reconnecting = true;
                inner.local.reconnect_attempts += 1;
                inner.local.reconnect_attempts
            };
            let delay = reconnect_delay_ms(attempt, rand::random());
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    async fn run_remote_loop(self: Arc<Self>) {
        loop {
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            let connected = connect_with_bearer(&self.config.remote_url, &self.config.bearer_token).await;
            match connected {
                Ok((stream, _)) => {
                    let (mut write, mut read) = stream.split();
                    let (tx, mut rx) = mpsc::unbounded_channel::<(Vec<u8>, bool)>();
                    let pending = {
                        let mut inner = self.state.lock();
                        inner.remote_tx = Some(tx);
                        inner.status.remote_ready = true;
                        inner.status.reconnecting = false;
                        inner.status.connected = inner.status.local_ready;
                        inner.remote.mark_open()
                    };
                    for (data, is_binary) in pending {
                        let _ = write.send(to_message(data, is_binary)).await;
                    }
                    let writer = tokio::spawn(async move {
                        while let Some((data, is_binary)) = rx.recv().await {
                            if write.send(to_message(data, is_binary)).await.is_err() {
                                break;
                            }
                        }
                    });
                    while let Some(message) = read.next().await {
                        match message {
                            Ok(Message::Binary(data)) => self.forward_to_local(data, true),
                            Ok(Message::Text(text)) => self.forward_to_local(text.into_bytes(), false),
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(_) => break,
                        }
                    }
                    writer.abort();
                }
                Err(_) => {}
            }
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            let attempt = {
                let mut inner = self.state.lock();
                inner.remote.mark_closed();
                inner.remote_tx = None;
                inner.status.remote_ready = false;
                inner.status.connected = false;
                inner.status.reconnecting = true;
                inner.guard.reset();
                inner.remote.reconnect_attempts += 1;
                inner.remote.reconnect_attempts
            };
            let delay = reconnect_delay_ms(attempt, rand::random());
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

/// Owns every live bridge for the agent: the staggered-start queue, the
/// idempotent `ensure_bridge` entry point used by both the Host Loop and
/// the tunnel's `bridge-request` handler, and the idle-teardown sweep.
pub struct BridgeManager<C: Clock + 'static> {
    clock: C,
    bridges: Mutex<HashMap<(String, String), Arc<Bridge<C>>>>,
    start_queue: Arc<Mutex<VecDeque<Arc<Bridge<C>>>>>,
}

impl<C: Clock + 'static> BridgeManager<C> {
    pub fn new(clock: C) -> Arc<Self> {
        let manager = Arc::new(Self {
            clock,
            bridges: Mutex::new(HashMap::new()),
            start_queue: Arc::new(Mutex::new(VecDeque::new())),
        });
        manager.spawn_start_drainer();
        manager
    }

    fn spawn_start_drainer(self: &Arc<Self>) {
        let queue = Arc::clone(&self.start_queue);
        tokio::spawn(async move {
            loop {
                let batch: Vec<_> = {
                    let mut q = queue.lock();
                    (0..START_BATCH_SIZE).filter_map(|_| q.pop_front()).collect()
                };
                for bridge in &batch {
                    bridge.start();
                }
                tokio::time::sleep(START_BATCH_PAUSE).await;
            }
        });
    }

    /// Idempotent: a bridge that already exists for `(project, doc_name)`
    /// is left untouched (spec §8.6).
    pub fn ensure_bridge(self: &Arc<Self>, project: &str, doc_name: &str, config: BridgeConfig) -> Arc<Bridge<C>> {
        let key = (project.to_string(), doc_name.to_string());
        let mut bridges = self.bridges.lock();
        if let Some(existing) = bridges.get(&key) {
            return Arc::clone(existing);
        }
        let bridge = Bridge::new(config, self.clock.clone());
        bridges.insert(key, Arc::clone(&bridge));
        self.start_queue.lock().push_back(Arc::clone(&bridge));
        bridge
    }

    pub fn stop_bridge(&self, project: &str, doc_name: &str) {
        let key = (project.to_string(), doc_name.to_string());
        if let Some(bridge) = self.bridges.lock().remove(&key) {
            bridge.stop();
        }
    }

    /// Stop and remove every bridge belonging to `project` — called when
    /// the Sync Pool releases its last reference to the project.
    pub fn stop_project(&self, project: &str) {
        let mut bridges = self.bridges.lock();
        let keys: Vec<_> = bridges.keys().filter(|(p, _)| p == project).cloned().collect();
        for key in keys {
            if let Some(bridge) = bridges.remove(&key) {
                bridge.stop();
            }
        }
    }

    pub fn statuses(&self, project: &str) -> Vec<BridgeStatus> {
        self.bridges
            .lock()
            .iter()
            .filter(|((p, _), _)| p == project)
            .map(|(_, bridge)| bridge.status())
            .collect()
    }

    pub fn bridge_count(&self) -> usize {
        self.bridges.lock().len()
    }

    /// One sweep of the idle-teardown pass (spec §4.E): any bridge whose
    /// last forwarded message is older than [`IDLE_TIMEOUT`] is stopped and
    /// removed, so a later `bridge-request` re-creates it fresh.
    pub fn sweep_idle(&self) {
        let now = self.clock.epoch_ms();
        let mut bridges = self.bridges.lock();
        let idle_keys: Vec<_> = bridges
            .iter()
            .filter(|(_, bridge)| {
                let status = bridge.status();
                status.connected
                    && status
                        .last_message_at
                        .is_some_and(|last| now.saturating_sub(last) > IDLE_TIMEOUT.as_millis() as u64)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in idle_keys {
            if let Some(bridge) = bridges.remove(&key) {
                bridge.stop();
            }
        }
    }

    /// Run [`Self::sweep_idle`] once a minute until the manager is dropped.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(IDLE_SWEEP_INTERVAL).await;
                manager.sweep_idle();
            }
        });
    }
}

#[cfg(test)]
#[path = "document_bridge_tests.rs"]
mod tests;
