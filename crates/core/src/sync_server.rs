// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project sync server record (spec §3, §4.D).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A per-project supervised (or adopted) sync server.
///
/// Invariant: `refcount >= 0`; when it reaches zero and `owned` is true the
/// pool kills the process and removes the record (enforced by the Sync
/// Server Pool, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncServer {
    pub project_dir: PathBuf,
    pub port: u16,
    pub pid: u32,
    pub refcount: u32,
    /// `true` if this agent spawned the process; `false` if adopted from an
    /// on-disk marker left by another instance.
    pub owned: bool,
    /// Set immediately before a deliberate kill so the exit handler can
    /// distinguish an intentional shutdown from a crash.
    pub expected_exit: bool,
}

impl SyncServer {
    pub fn owned(project_dir: PathBuf, port: u16, pid: u32) -> Self {
        Self { project_dir, port, pid, refcount: 1, owned: true, expected_exit: false }
    }

    pub fn adopted(project_dir: PathBuf, port: u16, pid: u32) -> Self {
        Self { project_dir, port, pid, refcount: 1, owned: false, expected_exit: false }
    }

    pub fn acquire(&mut self) {
        self.refcount += 1;
    }

    /// Release one reference; returns `true` if refcount hit zero, meaning
    /// the pool entry should be removed regardless of ownership. Whether to
    /// also kill the process is a separate decision gated on `owned` —
    /// adopted servers are untracked the same as owned ones, just not killed.
    pub fn release(&mut self) -> bool {
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount == 0
    }
}

/// On-disk adoption marker written alongside a sync server's state:
/// `{tmpdir}/mrmd-sync-{hash12}/server.pid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncServerMarker {
    pub pid: u32,
    pub port: u16,
}

#[cfg(test)]
#[path = "sync_server_tests.rs"]
mod tests;
