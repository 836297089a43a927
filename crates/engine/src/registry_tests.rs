// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use magent_core::FakeClock;
use magent_core::RuntimeDescriptor;
use std::os::unix::fs::PermissionsExt;

/// Writes a tiny python3 TCP echo-listener script into `bundle_dir` under
/// `language`, so the registry's packaged-executable resolution path picks
/// it up as a `Direct` resolution without needing a real language runtime.
fn install_fake_runtime(bundle_dir: &std::path::Path, language: &str) {
    let script = bundle_dir.join(language);
    std::fs::write(
        &script,
        r#"#!/usr/bin/env python3
import socket, sys
port = int(sys.argv[sys.argv.index("--port") + 1])
s = socket.socket(socket.AF_INET, socket.SOCK_STREAM)
s.setsockopt(socket.SOL_SOCKET, socket.SO_REUSEADDR, 1)
s.bind(("127.0.0.1", port))
s.listen(1)
while True:
    conn, _ = s.accept()
    conn.close()
"#,
    )
    .unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
}

fn test_registry(bundle_dir: &std::path::Path, store_dir: &std::path::Path, language: &str) -> Registry<FakeClock> {
    install_fake_runtime(bundle_dir, language);
    let descriptor = RuntimeDescriptor::new(language).with_startup_timeout(Duration::from_secs(5));
    Registry::with_descriptors(
        vec![descriptor],
        SessionStore::new(store_dir.to_path_buf()),
        PackagingConfig { packaged: true, bundle_dir: bundle_dir.to_path_buf() },
        FakeClock::new(),
    )
}

#[tokio::test]
async fn start_spawns_and_waits_for_listening() {
    let bundle = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let registry = test_registry(bundle.path(), store.path(), "echosrv");

    let config = StartConfig {
        session_name: SessionName::new("proj", "echosrv", "default"),
        language_key: "echosrv".to_string(),
        cwd: None,
        venv: None,
    };
    let session = registry.start(config).await.expect("start");
    assert!(session.port > 0);
    assert!(session.alive);

    let listed = registry.list(None);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "proj-echosrv-default");

    registry.stop("proj-echosrv-default");
    assert!(registry.list(None).is_empty());
}

#[tokio::test]
async fn starting_twice_returns_the_live_session() {
    let bundle = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let registry = test_registry(bundle.path(), store.path(), "echosrv");

    let config = StartConfig {
        session_name: SessionName::new("proj", "echosrv", "default"),
        language_key: "echosrv".to_string(),
        cwd: None,
        venv: None,
    };
    let first = registry.start(config.clone()).await.expect("start");
    let second = registry.start(config).await.expect("start again");
    assert_eq!(first.port, second.port);
    assert_eq!(first.pid, second.pid);

    registry.stop("proj-echosrv-default");
}

#[tokio::test]
async fn unknown_language_is_rejected() {
    let bundle = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let registry: Registry<FakeClock> = Registry::new(
        SessionStore::new(store.path().to_path_buf()),
        PackagingConfig { packaged: false, bundle_dir: bundle.path().to_path_buf() },
        FakeClock::new(),
    );

    let config = StartConfig {
        session_name: SessionName::new("proj", "cobol", "default"),
        language_key: "cobol".to_string(),
        cwd: None,
        venv: None,
    };
    let err = registry.start(config).await.unwrap_err();
    assert!(matches!(err, RegistryError::UnknownLanguage(lang) if lang == "cobol"));
}

#[tokio::test]
async fn reconcile_evicts_dead_pid_records() {
    let store_dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(store_dir.path().to_path_buf());
    let dead_session = RuntimeSession {
        name: "proj-python-default".to_string(),
        language: LanguageKey::new("python"),
        pid: i32::MAX as u32,
        port: 9999,
        cwd: PathBuf::from("/tmp"),
        venv_path: None,
        started_at_ms: 0,
        alive: true,
        extra: HashMap::new(),
    };
    store.save("proj-python-default.json", &dead_session).unwrap();

    let bundle = tempfile::tempdir().unwrap();
    let registry: Registry<FakeClock> = Registry::new(
        SessionStore::new(store_dir.path().to_path_buf()),
        PackagingConfig { packaged: false, bundle_dir: bundle.path().to_path_buf() },
        FakeClock::new(),
    );
    registry.reconcile();
    assert!(registry.list(None).is_empty());
    assert!(!store_dir.path().join("proj-python-default.json").exists());
}
