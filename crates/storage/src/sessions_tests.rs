// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use magent_core::runtime::LanguageKey;
use std::collections::HashMap;
use std::path::PathBuf;

fn sample(name: &str, port: u16) -> RuntimeSession {
    RuntimeSession {
        name: name.into(),
        language: LanguageKey::new("python"),
        pid: 123,
        port,
        cwd: PathBuf::from("/tmp"),
        venv_path: None,
        started_at_ms: 0,
        alive: true,
        extra: HashMap::new(),
    }
}

#[test]
fn save_then_load_all_roundtrips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    store.save("proj-python-main.json", &sample("proj:python:main", 5000)).expect("save");

    let loaded = store.load_all().expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].port, 5000);
}

#[test]
fn save_replaces_prior_file_for_same_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    store.save("s.json", &sample("s", 1)).expect("save");
    store.save("s.json", &sample("s", 2)).expect("save");

    let loaded = store.load_all().expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].port, 2);
}

#[test]
fn remove_is_not_an_error_when_file_is_already_gone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    store.remove("never-existed.json").expect("remove should be idempotent");
}

#[test]
fn load_all_on_missing_directory_returns_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path().join("does-not-exist"));
    assert!(store.load_all().expect("load").is_empty());
}

#[test]
fn load_all_skips_corrupt_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    store.save("good.json", &sample("good", 10)).expect("save");
    std::fs::write(dir.path().join("bad.json"), b"not json").expect("write corrupt file");

    let loaded = store.load_all().expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].port, 10);
}
