// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(TestId::from_string("tst-k"), 42);
    assert_eq!(map.get("tst-k"), Some(&42));
}

#[test]
fn define_id_has_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("tst-abcdef");
    assert_eq!(id.suffix(), "abcdef");
}

#[test]
fn define_id_short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefghijklmnop");
    assert_eq!(id.short(8), "abcdefgh");
}

#[test]
fn define_id_short_returns_full_when_shorter() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn define_id_display_roundtrips_from_string() {
    let id = TestId::from_string("tst-xyz");
    assert_eq!(id.to_string(), "tst-xyz");
}

// --- short() free function tests ---

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

// --- IdBuf tests ---

#[test]
fn idbuf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
}

#[test]
fn idbuf_roundtrips_through_serde() {
    let id = IdBuf::new("hello-world");
    let json = serde_json::to_string(&id).expect("serialize");
    let back: IdBuf = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(id.as_str(), back.as_str());
}

#[test]
fn idbuf_rejects_oversized_on_deserialize() {
    let too_long = "x".repeat(ID_MAX_LEN + 1);
    let json = serde_json::to_string(&too_long).expect("serialize");
    let result: Result<IdBuf, _> = serde_json::from_str(&json);
    assert!(result.is_err());
}
