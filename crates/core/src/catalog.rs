// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog types pushed to the relay so it knows what this machine can
//! bridge (spec §3, §4.G).

use crate::ids::MachineId;
use serde::{Deserialize, Serialize};

/// One document this machine can offer to bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub project: String,
    pub doc_path: String,
}

/// The full per-machine manifest pushed to the relay's catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub machine_id: MachineId,
    pub machine_name: String,
    pub hostname: String,
    pub capabilities: Vec<String>,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogManifest {
    pub fn new(machine_id: MachineId, machine_name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            machine_id,
            machine_name: machine_name.into(),
            hostname: hostname.into(),
            capabilities: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Replace the entry list, e.g. after a fresh hub scan.
    pub fn set_entries(&mut self, entries: Vec<CatalogEntry>) {
        self.entries = entries;
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
