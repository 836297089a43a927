// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_manifest_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig::load(dir.path()).unwrap();
    assert!(config.languages.is_empty());
}

#[test]
fn parses_language_overrides() {
    let doc = "+++\n[python]\nsession = \"gpu\"\nautoStart = true\n\n[node]\nautoStart = false\n+++\n";
    let config = ProjectConfig::parse(doc).unwrap();
    let python = config.language("python");
    assert_eq!(python.session.as_deref(), Some("gpu"));
    assert_eq!(python.auto_start, Some(true));
    let node = config.language("node");
    assert_eq!(node.auto_start, Some(false));
    assert_eq!(node.session, None);
}

#[test]
fn unknown_language_falls_back_to_default() {
    let config = ProjectConfig::default();
    assert_eq!(config.language("julia"), LanguageConfig::default());
}
