// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn load_parses_user_id_and_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, br#"{"userId":"u-1","token":"tok-abc"}"#).expect("write");

    let settings = Settings::load(&path).expect("load");
    assert_eq!(settings.user_id, "u-1");
    assert_eq!(settings.token, "tok-abc");
}

#[test]
fn load_fails_on_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.json");
    assert!(matches!(Settings::load(&path), Err(SettingsError::Io { .. })));
}

#[test]
fn load_fails_on_malformed_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, b"not json").expect("write");
    assert!(matches!(Settings::load(&path), Err(SettingsError::Malformed { .. })));
}
