// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local admin protocol exchanged over the Unix domain socket between
//! `magent` (the CLI) and `magentd` (the daemon).

use serde::{Deserialize, Serialize};

/// Requests the CLI can send to the daemon's admin listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AdminRequest {
    /// Health check / version handshake.
    Ping,
    /// Cross-project status overview.
    Status,
    /// List runtime sessions for a project (or all projects when `None`).
    ListRuntimes { project: Option<String> },
    /// List active document bridges for a project.
    ListBridges { project: String },
    /// Ask the daemon to shut down gracefully.
    Shutdown,
}

/// Responses the daemon sends back over the admin socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AdminResponse {
    Ok,
    Pong { version: String },
    Status {
        uptime_secs: u64,
        projects: Vec<ProjectAdminSummary>,
    },
    Runtimes {
        runtimes: Vec<RuntimeAdminSummary>,
    },
    Bridges {
        bridges: Vec<magent_core::BridgeStatus>,
    },
    ShuttingDown,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectAdminSummary {
    pub name: String,
    pub sync_port: Option<u16>,
    pub bridge_count: usize,
    pub runtime_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeAdminSummary {
    pub name: String,
    pub language: String,
    pub pid: u32,
    pub port: u16,
    pub alive: bool,
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
