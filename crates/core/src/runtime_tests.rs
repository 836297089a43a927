// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn session_name_sanitizes_both_separators() {
    let name = SessionName::new("proj/a", "py", "sess:b");
    // `:` joins the three components AND is itself substituted, so the
    // final name contains no `:` or `/` at all.
    assert!(!name.as_str().contains(':'));
    assert!(!name.as_str().contains('/'));
    assert_eq!(name.as_str(), "proj-a-py-sess-b");
}

#[test]
fn session_name_file_name_appends_json() {
    let name = SessionName::new("proj", "python", "main");
    assert_eq!(name.file_name(), "proj-python-main.json");
}

#[test]
fn descriptor_matches_canonical_and_alias() {
    let desc = RuntimeDescriptor::new("python").with_alias("py").with_alias("python3");
    assert!(desc.matches("python"));
    assert!(desc.matches("py"));
    assert!(desc.matches("python3"));
    assert!(!desc.matches("node"));
}

#[test]
fn descriptor_default_startup_timeout_is_ten_seconds() {
    let desc = RuntimeDescriptor::new("node");
    assert_eq!(desc.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
}

#[test]
fn julia_timeout_constant_is_sixty_seconds() {
    assert_eq!(JULIA_STARTUP_TIMEOUT, Duration::from_secs(60));
}

#[test]
fn session_base_url_matches_spec_format() {
    let session = RuntimeSession {
        name: "proj-python-main".into(),
        language: LanguageKey::new("python"),
        pid: 123,
        port: 5050,
        cwd: PathBuf::from("/tmp"),
        venv_path: None,
        started_at_ms: 0,
        alive: true,
        extra: HashMap::new(),
    };
    assert_eq!(session.base_url(), "http://127.0.0.1:5050/mrp/v1");
}

#[test]
fn validate_result_helpers() {
    let ok = ValidateResult::ok();
    assert!(ok.available);
    assert!(ok.reason.is_none());

    let bad = ValidateResult::unavailable("interpreter not found");
    assert!(!bad.available);
    assert_eq!(bad.reason.as_deref(), Some("interpreter not found"));
}

#[test]
fn runtime_session_roundtrips_through_json() {
    let session = RuntimeSession {
        name: "proj-python-main".into(),
        language: LanguageKey::new("python"),
        pid: 42,
        port: 9000,
        cwd: PathBuf::from("/work"),
        venv_path: Some(PathBuf::from("/work/.venv")),
        started_at_ms: 1000,
        alive: true,
        extra: HashMap::new(),
    };
    let json = serde_json::to_string(&session).expect("serialize");
    let back: RuntimeSession = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.pid, 42);
    assert_eq!(back.port, 9000);
    assert_eq!(back.venv_path, Some(PathBuf::from("/work/.venv")));
}
