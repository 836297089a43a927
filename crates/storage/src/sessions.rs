// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime session registry: one JSON file per session under a user-data
//! directory (spec §4.C, §6). Registry files are atomic-replace on update,
//! unlink on death — this module owns that single-writer-per-process
//! invariant; the registry's in-memory map lives in `magent-engine`.

use magent_core::RuntimeSession;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("corrupt session record at {path}: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Persist `session`, replacing any prior file for the same name via a
    /// write-to-temp-then-rename so a crash mid-write never leaves a
    /// half-written registry file for another process to re-adopt.
    pub fn save(&self, file_name: &str, session: &RuntimeSession) -> Result<(), SessionStoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|source| SessionStoreError::Io { path: self.dir.clone(), source })?;
        let final_path = self.path_for(file_name);
        let tmp_path = self.dir.join(format!("{file_name}.tmp"));
        let bytes = serde_json::to_vec_pretty(session)
            .map_err(|source| SessionStoreError::Corrupt { path: final_path.clone(), source })?;
        std::fs::write(&tmp_path, bytes)
            .map_err(|source| SessionStoreError::Io { path: tmp_path.clone(), source })?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|source| SessionStoreError::Io { path: final_path, source })?;
        Ok(())
    }

    /// Remove a session's registry file. Missing files are not an error —
    /// callers unlink unconditionally on death.
    pub fn remove(&self, file_name: &str) -> Result<(), SessionStoreError> {
        let path = self.path_for(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Io { path, source }),
        }
    }

    /// Load every registry file in the directory. A file that fails to
    /// parse is skipped and logged rather than aborting the whole load —
    /// one corrupt record shouldn't block re-adoption of the rest.
    pub fn load_all(&self) -> Result<Vec<RuntimeSession>, SessionStoreError> {
        let mut sessions = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(sessions),
            Err(source) => return Err(SessionStoreError::Io { path: self.dir.clone(), source }),
        };
        for entry in entries {
            let entry = entry.map_err(|source| SessionStoreError::Io { path: self.dir.clone(), source })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => match serde_json::from_slice::<RuntimeSession>(&bytes) {
                    Ok(session) => sessions.push(session),
                    Err(source) => {
                        tracing::warn!(path = %path.display(), %source, "dropping corrupt session record");
                    }
                },
                Err(source) => {
                    tracing::warn!(path = %path.display(), %source, "failed to read session record");
                }
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
