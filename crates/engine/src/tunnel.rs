// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunnel Provider (spec §4.F): the single long-lived WebSocket to the
//! relay that multiplexes runtime lookups, HTTP request proxying, and
//! WebSocket session proxying over JSON frames keyed by `id`.
//!
//! [`TunnelProvider::run`] owns the upstream connection and reconnects
//! after a fixed delay on any drop, aborting every in-flight HTTP/WS
//! session it was carrying (spec §7 `TunnelDisconnected`).

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use magent_core::{Clock, LanguageKey, MachineId, SessionName};
use magent_wire::TunnelMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;

use crate::document_bridge::{BridgeConfig, BridgeManager};
use crate::host_loop::ActiveProjects;
use crate::registry::{Registry, StartConfig};

/// Delay before retrying a dropped provider connection (spec §4.F).
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub relay_base_ws: String,
    pub relay_base_http: String,
    pub user_id: String,
    pub token: String,
    pub machine_id: MachineId,
    pub machine_name: String,
    pub hostname: String,
    pub capabilities: Vec<String>,
}

impl TunnelConfig {
    fn connect_url(&self) -> String {
        format!(
            "{}/tunnel/{}?role=provider&token={}&machine_id={}&machine_name={}&hostname={}",
            self.relay_base_ws,
            urlencode(&self.user_id),
            urlencode(&self.token),
            urlencode(self.machine_id.as_str()),
            urlencode(&self.machine_name),
            urlencode(&self.hostname),
        )
    }

    /// Used by Document Bridge wiring for a `bridge-request`'s remote URL
    /// (spec §4.E), so the tunnel config is the one place both the relay
    /// scheme and the user id live.
    pub fn sync_url(&self, project: &str, doc_name: &str) -> String {
        format!(
            "{}/sync/{}/{}/{}?token={}",
            self.relay_base_ws,
            urlencode(&self.user_id),
            urlencode(project),
            urlencode(doc_name),
            urlencode(&self.token),
        )
    }
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Encode a local sync-server path, preserving `/` as a segment separator
/// but percent-escaping within each segment (spec §4.E).
fn encode_doc_path_segments(doc_path: &str) -> String {
    doc_path.split('/').map(urlencode).collect::<Vec<_>>().join("/")
}

/// Resolve a `start-runtime` request's session name (spec §4.C, §4.F).
///
/// When `document_path`/`project_root` are both present, this is the full
/// `getForDocument` path: load the project manifest and the document's own
/// frontmatter and run the same precedence rules the Host Loop's bridged
/// documents get. Otherwise — an ad-hoc start with just a bare `name` — the
/// session lives under a synthetic `adhoc` project keyed off whatever
/// `project_root` was given, or `"adhoc"` if none was.
fn resolve_start_session_name(
    language: &str,
    name: Option<&str>,
    document_path: Option<&str>,
    project_root: Option<&str>,
) -> SessionName {
    if let (Some(doc_path), Some(root)) = (document_path, project_root) {
        let root_path = std::path::Path::new(root);
        let project_name = root_path.file_name().and_then(|n| n.to_str()).unwrap_or("adhoc");
        let project_config = magent_config::ProjectConfig::load(root_path).unwrap_or_default();
        let frontmatter = std::fs::read_to_string(doc_path)
            .ok()
            .and_then(|content| magent_config::parse_frontmatter(&content).ok())
            .unwrap_or_default();
        let language_key = LanguageKey::new(language);
        let resolution =
            magent_config::resolve_session_name(project_name, &language_key, &project_config, &frontmatter);
        return resolution.session_name;
    }
    let project = project_root.and_then(|root| std::path::Path::new(root).file_name()).and_then(|n| n.to_str());
    SessionName::new(project.unwrap_or("adhoc"), language, name.unwrap_or("default"))
}

struct WsProxySession {
    local_tx: Option<mpsc::UnboundedSender<Message>>,
    pending: VecDeque<Message>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct TunnelState {
    http_sessions: HashMap<String, JoinHandle<()>>,
    ws_sessions: HashMap<String, WsProxySession>,
}

impl TunnelState {
    fn abort_all(&mut self) {
        for (_, handle) in self.http_sessions.drain() {
            handle.abort();
        }
        for (_, session) in self.ws_sessions.drain() {
            session.task.abort();
        }
    }
}

/// The single multiplexed connection to the relay's tunnel endpoint.
pub struct TunnelProvider<C: Clock + 'static> {
    config: TunnelConfig,
    registry: Arc<Registry<C>>,
    bridges: Arc<BridgeManager<C>>,
    active_projects: ActiveProjects,
    http_client: reqwest::Client,
    destroyed: AtomicBool,
    state: Mutex<TunnelState>,
}

impl<C: Clock + 'static> TunnelProvider<C> {
    pub fn new(
        config: TunnelConfig,
        registry: Arc<Registry<C>>,
        bridges: Arc<BridgeManager<C>>,
        active_projects: ActiveProjects,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            bridges,
            active_projects,
            http_client: reqwest::Client::new(),
            destroyed: AtomicBool::new(false),
            state: Mutex::new(TunnelState::default()),
        })
    }

    pub fn stop(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.state.lock().abort_all();
    }

    /// Maintain the upstream connection for as long as the provider isn't
    /// stopped, reconnecting after [`RECONNECT_DELAY`] on any drop.
    pub async fn run(self: Arc<Self>) {
        loop {
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            if let Err(err) = Arc::clone(&self).run_once().await {
                tracing::warn!(%err, "tunnel provider disconnected");
            }
            self.state.lock().abort_all();
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    #[allow(clippy::expect_used)]
    async fn run_once(self: Arc<Self>) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let url = self.config.connect_url();
        let mut request = url.into_client_request()?;
        let value = format!("Bearer {}", self.config.token);
        request
            .headers_mut()
            .insert(AUTHORIZATION, value.parse().expect("bearer header value is valid ASCII"));
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<TunnelMessage>();
        let _ = outbound_tx.send(TunnelMessage::ProviderInfo {
            machine_id: self.config.machine_id.as_str().to_string(),
            machine_name: self.config.machine_name.clone(),
            hostname: self.config.hostname.clone(),
            capabilities: self.config.capabilities.clone(),
        });

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let Ok(text) = serde_json::to_string(&message) else { continue };
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<TunnelMessage>(&text) {
                    Ok(frame) => Arc::clone(&self).handle_inbound(frame, outbound_tx.clone()),
                    Err(err) => tracing::warn!(%err, "malformed tunnel frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    writer.abort();
                    return Err(err);
                }
            }
        }
        writer.abort();
        Ok(())
    }

    fn handle_inbound(self: Arc<Self>, frame: TunnelMessage, outbound: mpsc::UnboundedSender<TunnelMessage>) {
        match frame {
            TunnelMessage::ListRuntimes { id, language } => {
                let runtimes = self.registry.list(language.as_deref());
                let _ = outbound.send(TunnelMessage::RuntimesList { id, runtimes });
            }
            TunnelMessage::StartRuntime { id, language, name, cwd, venv, document_path, project_root } => {
                tokio::spawn(Arc::clone(&self).handle_start_runtime(
                    id,
                    language,
                    name,
                    cwd,
                    venv,
                    document_path,
                    project_root,
                    outbound,
                ));
            }
            TunnelMessage::StopRuntime { name, .. } => {
                self.registry.stop(&name);
            }
            TunnelMessage::RestartRuntime { id, name } => {
                tokio::spawn(async move {
                    match self.registry.restart(&name).await {
                        Ok(session) => {
                            let language = session.language.as_str().to_string();
                            let mut runtimes = HashMap::new();
                            runtimes.insert(language, session);
                            let _ = outbound.send(TunnelMessage::RuntimeStarted { id, runtimes });
                        }
                        Err(err) => {
                            let _ = outbound.send(TunnelMessage::RuntimeError { id, error: err.to_string() });
                        }
                    }
                });
            }
            TunnelMessage::HttpReq { id, port, method, path, headers, body } => {
                self.start_http_session(id, port, method, path, headers, body, outbound);
            }
            TunnelMessage::WsOpen { id, port, path } => {
                self.start_ws_session(id, port, path, outbound);
            }
            TunnelMessage::WsMsg { id, data, bin } => {
                self.forward_ws_to_local(&id, data, bin);
            }
            TunnelMessage::WsClose { id, .. } => {
                if let Some(session) = self.state.lock().ws_sessions.remove(&id) {
                    session.task.abort();
                }
            }
            TunnelMessage::BridgeRequest { project, doc_path } => {
                let Some(sync_port) = self.active_projects.lock().get(&project).map(|p| p.sync_port) else {
                    tracing::warn!(%project, %doc_path, "bridge-request for a project the host loop hasn't scanned yet");
                    return;
                };
                let config = BridgeConfig {
                    doc_name: doc_path.clone(),
                    local_url: format!("ws://127.0.0.1:{sync_port}/{}", encode_doc_path_segments(&doc_path)),
                    remote_url: self.config.sync_url(&project, &doc_path),
                    bearer_token: self.config.token.clone(),
                };
                self.bridges.ensure_bridge(&project, &doc_path, config);
            }
            // Responses and unsolicited provider-only frames never arrive
            // inbound; voice transcription is an optional capability this
            // build doesn't implement.
            TunnelMessage::VoiceTranscribe { id, .. } => {
                let _ = outbound.send(TunnelMessage::VoiceResult {
                    id,
                    result: None,
                    error: Some("voice transcription not supported on this machine".to_string()),
                });
            }
            TunnelMessage::RuntimesList { .. }
            | TunnelMessage::RuntimeStarted { .. }
            | TunnelMessage::RuntimeUpdate { .. }
            | TunnelMessage::RuntimeError { .. }
            | TunnelMessage::HttpRes { .. }
            | TunnelMessage::HttpChunk { .. }
            | TunnelMessage::HttpEnd { .. }
            | TunnelMessage::HttpError { .. }
            | TunnelMessage::WsOpened { .. }
            | TunnelMessage::WsError { .. }
            | TunnelMessage::VoiceResult { .. }
            | TunnelMessage::ProviderInfo { .. } => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_start_runtime(
        self: Arc<Self>,
        id: String,
        language: Option<String>,
        name: Option<String>,
        cwd: Option<String>,
        venv: Option<String>,
        document_path: Option<String>,
        project_root: Option<String>,
        outbound: mpsc::UnboundedSender<TunnelMessage>,
    ) {
        let Some(language) = language else {
            let _ = outbound.send(TunnelMessage::RuntimeError { id, error: "language is required".to_string() });
            return;
        };

        let session_name =
            resolve_start_session_name(&language, name.as_deref(), document_path.as_deref(), project_root.as_deref());
        let config = StartConfig {
            session_name,
            language_key: language.clone(),
            cwd: cwd.map(PathBuf::from),
            venv: venv.map(PathBuf::from),
        };

        // Julia's JIT cold start is far slower than the other built-in
        // runtimes; don't block the caller on it (spec §4.C) — answer with
        // a deferred `runtime-update` once the slow start actually finishes
        // instead of the synchronous `runtime-started`.
        if language == "julia" {
            tokio::spawn(async move {
                match self.registry.start(config).await {
                    Ok(session) => {
                        let mut runtimes = HashMap::new();
                        runtimes.insert(language.clone(), session);
                        let _ = outbound.send(TunnelMessage::RuntimeUpdate { request_id: id, language, runtimes });
                    }
                    Err(err) => {
                        let _ = outbound.send(TunnelMessage::RuntimeError { id, error: err.to_string() });
                    }
                }
            });
            return;
        }

        match self.registry.start(config).await {
            Ok(session) => {
                let mut runtimes = HashMap::new();
                runtimes.insert(language, session);
                let _ = outbound.send(TunnelMessage::RuntimeStarted { id, runtimes });
            }
            Err(err) => {
                let _ = outbound.send(TunnelMessage::RuntimeError { id, error: err.to_string() });
            }
        }
    }

    /// spec §4.F HTTP proxy: issue the request locally and stream the
    /// response back as `http-res` then one `http-chunk` per body chunk,
    /// then a terminal `http-end`/`http-error`.
    fn start_http_session(
        self: &Arc<Self>,
        id: String,
        port: u16,
        method: String,
        path: String,
        headers: HashMap<String, String>,
        body: Option<String>,
        outbound: mpsc::UnboundedSender<TunnelMessage>,
    ) {
        let client = self.http_client.clone();
        let provider = Arc::clone(self);
        let session_id = id.clone();
        let task = tokio::spawn(async move {
            run_http_proxy(client, id.clone(), port, method, path, headers, body, outbound).await;
            provider.state.lock().http_sessions.remove(&id);
        });
        self.state.lock().http_sessions.insert(session_id, task);
    }

    /// spec §4.F WS proxy: open a local WebSocket for `port`/`path`,
    /// reject a duplicate id, and otherwise buffer pre-open `ws-msg`
    /// frames until the local side accepts.
    fn start_ws_session(self: &Arc<Self>, id: String, port: u16, path: String, outbound: mpsc::UnboundedSender<TunnelMessage>) {
        let mut state = self.state.lock();
        if state.ws_sessions.contains_key(&id) {
            let _ = outbound.send(TunnelMessage::WsError { id, error: "duplicate session id".to_string() });
            return;
        }

        let provider = Arc::clone(self);
        let session_id = id.clone();
        let task = tokio::spawn(async move {
            run_ws_proxy(provider, session_id, port, path, outbound).await;
        });

        state.ws_sessions.insert(id, WsProxySession { local_tx: None, pending: VecDeque::new(), task });
    }

    fn forward_ws_to_local(&self, id: &str, data: String, bin: bool) {
        let message = if bin {
            match BASE64.decode(&data) {
                Ok(bytes) => Message::Binary(bytes),
                Err(_) => return,
            }
        } else {
            Message::Text(data)
        };
        let mut state = self.state.lock();
        let Some(session) = state.ws_sessions.get_mut(id) else { return };
        match &session.local_tx {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => session.pending.push_back(message),
        }
    }
}

/// Drive one local WS proxy session to completion, wiring the local
/// socket's send half into the session's `local_tx` (flushing whatever
/// buffered pre-open `ws-msg` frames `forward_ws_to_local` queued) and
/// removing the session from the map on every terminal path so a local
/// connect failure or close doesn't leak a stale entry.
async fn run_ws_proxy<C: Clock + 'static>(
    provider: Arc<TunnelProvider<C>>,
    id: String,
    port: u16,
    path: String,
    outbound: mpsc::UnboundedSender<TunnelMessage>,
) {
    let url = format!("ws://127.0.0.1:{port}/{path}");
    let (stream, _) = match tokio_tungstenite::connect_async(&url).await {
        Ok(connected) => connected,
        Err(err) => {
            provider.state.lock().ws_sessions.remove(&id);
            let _ = outbound.send(TunnelMessage::WsError { id, error: err.to_string() });
            return;
        }
    };
    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    {
        let mut state = provider.state.lock();
        if let Some(session) = state.ws_sessions.get_mut(&id) {
            for pending in session.pending.drain(..) {
                let _ = tx.send(pending);
            }
            session.local_tx = Some(tx);
        }
    }
    let _ = outbound.send(TunnelMessage::WsOpened { id: id.clone() });

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                let _ = outbound.send(TunnelMessage::WsMsg { id: id.clone(), data: BASE64.encode(&data), bin: true });
            }
            Ok(Message::Text(text)) => {
                let _ = outbound.send(TunnelMessage::WsMsg { id: id.clone(), data: text, bin: false });
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (Some(u16::from(f.code)), Some(f.reason.to_string())))
                    .unwrap_or((None, None));
                let _ = outbound.send(TunnelMessage::WsClose { id: id.clone(), code, reason });
                break;
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    writer.abort();
    provider.state.lock().ws_sessions.remove(&id);
}

/// Issue a single proxied HTTP request and stream the response back as
/// `http-res` then one `http-chunk` per body chunk, then a terminal
/// `http-end`/`http-error` (spec §4.F).
async fn run_http_proxy(
    client: reqwest::Client,
    id: String,
    port: u16,
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Option<String>,
    outbound: mpsc::UnboundedSender<TunnelMessage>,
) {
    let method = match reqwest::Method::from_bytes(method.as_bytes()) {
        Ok(method) => method,
        Err(err) => {
            let _ = outbound.send(TunnelMessage::HttpError { id, error: Some(err.to_string()) });
            return;
        }
    };
    let url = format!("http://127.0.0.1:{port}{path}");
    let mut request = client.request(method, url);
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            let _ = outbound.send(TunnelMessage::HttpError { id, error: Some(err.to_string()) });
            return;
        }
    };

    let status = response.status().as_u16();
    let response_headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();
    let _ = outbound.send(TunnelMessage::HttpRes { id: id.clone(), status, headers: response_headers });

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                let _ = outbound.send(TunnelMessage::HttpChunk { id: id.clone(), data: BASE64.encode(&bytes) });
            }
            Err(err) => {
                let _ = outbound.send(TunnelMessage::HttpError { id, error: Some(err.to_string()) });
                return;
            }
        }
    }
    let _ = outbound.send(TunnelMessage::HttpEnd { id });
}

#[cfg(test)]
#[path = "tunnel_tests.rs"]
mod tests;
