// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (spec §6).

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: MAGENT_STATE_DIR > XDG_STATE_HOME/magent > ~/.local/state/magent
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MAGENT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("magent"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/magent"))
}

/// `MARKCO_CLOUD_URL` — https origin of the relay (spec §6). `ws`/`wss` is
/// derived from it by scheme substitution in the callers that need a
/// WebSocket URL rather than stored twice.
pub fn cloud_url() -> Result<String, LifecycleError> {
    std::env::var("MARKCO_CLOUD_URL").map_err(|_| LifecycleError::MissingEnv("MARKCO_CLOUD_URL"))
}

/// `https://` → `wss://`, `http://` → `ws://`.
pub fn cloud_ws_url() -> Result<String, LifecycleError> {
    let http = cloud_url()?;
    Ok(if let Some(rest) = http.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http
    })
}

/// `MRMD_MACHINE_HUB_ROOTS` — OS-path-delimiter-separated list of
/// directories to scan (spec §6, §4.G.1).
pub fn hub_roots() -> Vec<PathBuf> {
    std::env::var("MRMD_MACHINE_HUB_ROOTS")
        .ok()
        .map(|raw| std::env::split_paths(&raw).collect())
        .unwrap_or_default()
}

/// `MRMD_MACHINE_ID` — defaults to `{hostname}-{user}` (spec §6).
pub fn machine_id() -> String {
    std::env::var("MRMD_MACHINE_ID").unwrap_or_else(|_| format!("{}-{}", hostname_string(), user_string()))
}

/// `MRMD_MACHINE_NAME` — defaults to `{hostname}` (spec §6).
pub fn machine_name() -> String {
    std::env::var("MRMD_MACHINE_NAME").unwrap_or_else(|_| hostname_string())
}

pub fn hostname_string() -> String {
    hostname::get().ok().and_then(|h| h.into_string().ok()).unwrap_or_else(|| "localhost".to_string())
}

fn user_string() -> String {
    std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_else(|_| "user".to_string())
}

/// `MRMD_MACHINE_RESCAN_MS` / `MACHINE_HUB_SCAN_INTERVAL_MS` — loop interval,
/// default 30s (spec §4.G, §6).
pub fn rescan_interval() -> Duration {
    std::env::var("MRMD_MACHINE_RESCAN_MS")
        .or_else(|_| std::env::var("MACHINE_HUB_SCAN_INTERVAL_MS"))
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Executable used to spawn a project's sync server (spec §4.D.4). The
/// sync protocol itself is an opaque out-of-scope collaborator (spec §1);
/// this agent only needs to know what to exec.
pub fn sync_server_binary() -> PathBuf {
    std::env::var("MAGENT_SYNC_SERVER_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("mrmd-sync-server"))
}

/// Path to the settings file holding `{userId, token}` (spec §6).
pub fn settings_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("MAGENT_SETTINGS_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("settings.json"))
}
