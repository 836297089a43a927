// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document Bridge state and the replay-protection guard (spec §4.E).
//!
//! The bridge itself drives real sockets and timers and lives in
//! `magent-engine`; this module holds the pure, unit-testable pieces: the
//! per-side connection state machine, the status projection, and the
//! `should_forward_remote_frame` guard the Design Notes call out explicitly
//! as needing to be isolated as a pure function.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-side WebSocket connection state (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// One side (local or remote) of a bridge: its socket state, pending-frame
/// queue, and reconnect bookkeeping.
#[derive(Debug, Clone)]
pub struct BridgeSide {
    pub state: ConnState,
    pub ready: bool,
    pub pending: VecDeque<(Vec<u8>, bool)>,
    pub reconnect_attempts: u32,
}

impl Default for BridgeSide {
    fn default() -> Self {
        Self {
            state: ConnState::Connecting,
            ready: false,
            pending: VecDeque::new(),
            reconnect_attempts: 0,
        }
    }
}

impl BridgeSide {
    /// Mark this side open: ready, attempts reset, pending queue drained
    /// into the caller-supplied sink (the socket write happens outside this
    /// pure type).
    pub fn mark_open(&mut self) -> Vec<(Vec<u8>, bool)> {
        self.state = ConnState::Open;
        self.ready = true;
        self.reconnect_attempts = 0;
        self.pending.drain(..).collect()
    }

    pub fn mark_closed(&mut self) {
        self.state = ConnState::Closed;
        self.ready = false;
    }

    /// Enqueue a frame for later delivery (the other side wasn't ready).
    pub fn enqueue(&mut self, data: Vec<u8>, is_binary: bool) {
        self.pending.push_back((data, is_binary));
    }
}

/// Tracks whether the remote→local replay guard has fired yet for a bridge.
/// Reset on every remote disconnect per spec §4.E.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayGuard {
    pub initial_sync_done: bool,
}

impl ReplayGuard {
    pub fn reset(&mut self) {
        self.initial_sync_done = false;
    }
}

/// Decide whether a remote→local frame should be forwarded, per the
/// replay-protection guard in spec §4.E.
///
/// Only binary frames carrying the two-byte `(messageType, subType)` header
/// are inspected; anything else (including text frames, which this bridge
/// never expects from the sync protocol but mustn't silently swallow) is
/// forwarded unconditionally. Mutates `guard.initial_sync_done` when a
/// `(0,0)` or `(0,2)` frame is seen.
pub fn should_forward_remote_frame(payload: &[u8], is_binary: bool, guard: &mut ReplayGuard) -> bool {
    if guard.initial_sync_done || !is_binary || payload.len() < 2 {
        return true;
    }

    let message_type = payload[0];
    let sub_type = payload[1];

    if message_type == 0 && sub_type == 1 {
        return guard.initial_sync_done;
    }

    if message_type == 0 && (sub_type == 0 || sub_type == 2) {
        guard.initial_sync_done = true;
    }

    true
}

/// Status projection exposed to the admin/CLI surface (spec §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub doc_name: String,
    pub local_ready: bool,
    pub remote_ready: bool,
    pub connected: bool,
    pub reconnecting: bool,
    pub last_error: Option<String>,
    pub last_message_at: Option<u64>,
    pub started_at: u64,
}

impl BridgeStatus {
    pub fn new(doc_name: impl Into<String>, started_at: u64) -> Self {
        Self {
            doc_name: doc_name.into(),
            local_ready: false,
            remote_ready: false,
            connected: false,
            reconnecting: false,
            last_error: None,
            last_message_at: None,
            started_at,
        }
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
