// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings file: read-only source of the relay bearer token and user id
//! (spec §6). The agent never writes this file — it's owned by the
//! editor's sign-in flow.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed settings file at {path}: {source}")]
    Malformed { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub user_id: String,
    pub token: String,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let bytes = std::fs::read(path)
            .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_slice(&bytes)
            .map_err(|source| SettingsError::Malformed { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
