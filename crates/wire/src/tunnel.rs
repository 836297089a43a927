// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunnel Provider wire protocol (spec §4.F): JSON text frames multiplexed
//! by `id` over the single long-lived provider WebSocket.

use magent_core::RuntimeSession;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One frame of the tunnel protocol. Tagged on the wire by `kind`, matching
/// the relay's own naming rather than Rust convention, since this struct's
/// only job is to serialize byte-for-byte compatibly with the relay.
/// `rename_all_fields` camelCases every struct-variant field the same way
/// `rename_all` kebab-cases the variant tags — §4.F's wire table uses
/// camelCase keys (`documentPath`, `requestId`, `docPath`, `machineId`,
/// `audioBase64`, ...) throughout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TunnelMessage {
    // --- runtime management ---
    ListRuntimes {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    RuntimesList {
        id: String,
        runtimes: Vec<RuntimeSession>,
    },
    StartRuntime {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        venv: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        document_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_root: Option<String>,
    },
    RuntimeStarted {
        id: String,
        runtimes: HashMap<String, RuntimeSession>,
    },
    RuntimeUpdate {
        request_id: String,
        language: String,
        runtimes: HashMap<String, RuntimeSession>,
    },
    RuntimeError {
        id: String,
        error: String,
    },
    StopRuntime {
        id: String,
        name: String,
    },
    RestartRuntime {
        id: String,
        name: String,
    },

    // --- HTTP proxy ---
    HttpReq {
        id: String,
        port: u16,
        method: String,
        path: String,
        headers: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    HttpRes {
        id: String,
        status: u16,
        headers: HashMap<String, String>,
    },
    HttpChunk {
        id: String,
        /// Base64-encoded body bytes.
        data: String,
    },
    HttpEnd {
        id: String,
    },
    HttpError {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // --- WebSocket proxy ---
    WsOpen {
        id: String,
        port: u16,
        path: String,
    },
    WsOpened {
        id: String,
    },
    WsMsg {
        id: String,
        /// UTF-8 text when `bin` is false, base64 when `bin` is true.
        data: String,
        bin: bool,
    },
    WsClose {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    WsError {
        id: String,
        error: String,
    },

    // --- document bridge wiring ---
    BridgeRequest {
        project: String,
        doc_path: String,
    },

    // --- optional voice capability ---
    VoiceTranscribe {
        id: String,
        audio_base64: String,
        mime_type: String,
        url: String,
    },
    VoiceResult {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // --- sent once on connection open ---
    ProviderInfo {
        machine_id: String,
        machine_name: String,
        hostname: String,
        capabilities: Vec<String>,
    },
}

impl TunnelMessage {
    /// The multiplexing `id` this frame carries, where applicable.
    /// `bridge-request` and `provider-info` carry no id (they are
    /// unsolicited, not request/response-correlated).
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            TunnelMessage::ListRuntimes { id, .. }
            | TunnelMessage::RuntimesList { id, .. }
            | TunnelMessage::StartRuntime { id, .. }
            | TunnelMessage::RuntimeStarted { id, .. }
            | TunnelMessage::RuntimeError { id, .. }
            | TunnelMessage::StopRuntime { id, .. }
            | TunnelMessage::RestartRuntime { id, .. }
            | TunnelMessage::HttpReq { id, .. }
            | TunnelMessage::HttpRes { id, .. }
            | TunnelMessage::HttpChunk { id, .. }
            | TunnelMessage::HttpEnd { id }
            | TunnelMessage::HttpError { id, .. }
            | TunnelMessage::WsOpen { id, .. }
            | TunnelMessage::WsOpened { id }
            | TunnelMessage::WsMsg { id, .. }
            | TunnelMessage::WsClose { id, .. }
            | TunnelMessage::WsError { id, .. }
            | TunnelMessage::VoiceTranscribe { id, .. }
            | TunnelMessage::VoiceResult { id, .. } => Some(id),
            TunnelMessage::RuntimeUpdate { request_id, .. } => Some(request_id),
            TunnelMessage::BridgeRequest { .. } | TunnelMessage::ProviderInfo { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "tunnel_tests.rs"]
mod tests;
