// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk sync-server adoption markers (spec §4.D, §6):
//! `{tmpdir}/mrmd-sync-{hash12}/server.pid` containing `{pid, port}`.

use magent_core::sync_server::SyncServerMarker;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("corrupt marker at {path}: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
}

/// Stable 12-hex-character pool key for a project's resolved absolute path.
pub fn pool_key(project_dir: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_dir.as_os_str().as_encoded_bytes());
    let digest = hasher.finalize();
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

fn marker_dir(tmp_dir: &Path, project_dir: &Path) -> PathBuf {
    tmp_dir.join(format!("mrmd-sync-{}", pool_key(project_dir)))
}

fn marker_path(tmp_dir: &Path, project_dir: &Path) -> PathBuf {
    marker_dir(tmp_dir, project_dir).join("server.pid")
}

/// Write (or atomically replace) the adoption marker for `project_dir`.
pub fn write_marker(
    tmp_dir: &Path,
    project_dir: &Path,
    marker: SyncServerMarker,
) -> Result<(), MarkerError> {
    let dir = marker_dir(tmp_dir, project_dir);
    std::fs::create_dir_all(&dir).map_err(|source| MarkerError::Io { path: dir.clone(), source })?;
    let path = marker_path(tmp_dir, project_dir);
    let tmp_path = dir.join("server.pid.tmp");
    let bytes = serde_json::to_vec(&marker)
        .map_err(|source| MarkerError::Corrupt { path: path.clone(), source })?;
    std::fs::write(&tmp_path, bytes).map_err(|source| MarkerError::Io { path: tmp_path.clone(), source })?;
    std::fs::rename(&tmp_path, &path).map_err(|source| MarkerError::Io { path, source })?;
    Ok(())
}

/// Read a project's adoption marker, if present.
pub fn read_marker(tmp_dir: &Path, project_dir: &Path) -> Result<Option<SyncServerMarker>, MarkerError> {
    let path = marker_path(tmp_dir, project_dir);
    match std::fs::read(&path) {
        Ok(bytes) => {
            let marker = serde_json::from_slice(&bytes)
                .map_err(|source| MarkerError::Corrupt { path: path.clone(), source })?;
            Ok(Some(marker))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MarkerError::Io { path, source }),
    }
}

/// Delete a stale marker (dead PID or idle port) so the pool can spawn fresh.
pub fn delete_marker(tmp_dir: &Path, project_dir: &Path) -> Result<(), MarkerError> {
    let path = marker_path(tmp_dir, project_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MarkerError::Io { path, source }),
    }
}

#[cfg(test)]
#[path = "sync_markers_tests.rs"]
mod tests;
