// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn manifest_builder_accumulates_capabilities() {
    let manifest = CatalogManifest::new(MachineId::new("host-1"), "Alice's Laptop", "alice-mbp")
        .with_capability("voice-transcribe")
        .with_capability("pty");
    assert_eq!(manifest.capabilities, vec!["voice-transcribe", "pty"]);
    assert!(manifest.entries.is_empty());
}

#[test]
fn set_entries_replaces_prior_scan_results() {
    let mut manifest = CatalogManifest::new(MachineId::new("host-1"), "Alice's Laptop", "alice-mbp");
    manifest.set_entries(vec![CatalogEntry { project: "blog".into(), doc_path: "notes/today".into() }]);
    assert_eq!(manifest.entries.len(), 1);

    manifest.set_entries(vec![]);
    assert!(manifest.entries.is_empty());
}

#[test]
fn manifest_roundtrips_through_json() {
    let mut manifest = CatalogManifest::new(MachineId::new("host-2"), "Bob", "bob-pc");
    manifest.set_entries(vec![CatalogEntry { project: "p".into(), doc_path: "d".into() }]);
    let json = serde_json::to_string(&manifest).expect("serialize");
    let back: CatalogManifest = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.machine_id.as_str(), "host-2");
    assert_eq!(back.entries, manifest.entries);
}
