// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pool_key_is_twelve_hex_characters_and_stable() {
    let path = Path::new("/home/alice/projects/blog");
    let key = pool_key(path);
    assert_eq!(key.len(), 12);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(key, pool_key(path));
}

#[test]
fn different_paths_get_different_keys() {
    assert_ne!(pool_key(Path::new("/a")), pool_key(Path::new("/b")));
}

#[test]
fn write_then_read_marker_roundtrips() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = Path::new("/home/alice/projects/blog");
    write_marker(tmp.path(), project, SyncServerMarker { pid: 111, port: 6000 }).expect("write");

    let marker = read_marker(tmp.path(), project).expect("read").expect("present");
    assert_eq!(marker.pid, 111);
    assert_eq!(marker.port, 6000);
}

#[test]
fn read_marker_returns_none_when_absent() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = Path::new("/home/alice/projects/nothing-here");
    assert!(read_marker(tmp.path(), project).expect("read").is_none());
}

#[test]
fn delete_marker_is_idempotent() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = Path::new("/home/alice/projects/blog");
    write_marker(tmp.path(), project, SyncServerMarker { pid: 1, port: 2 }).expect("write");
    delete_marker(tmp.path(), project).expect("delete");
    delete_marker(tmp.path(), project).expect("delete again");
    assert!(read_marker(tmp.path(), project).expect("read").is_none());
}

#[test]
fn write_marker_replaces_prior_value() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = Path::new("/home/alice/projects/blog");
    write_marker(tmp.path(), project, SyncServerMarker { pid: 1, port: 100 }).expect("write");
    write_marker(tmp.path(), project, SyncServerMarker { pid: 2, port: 200 }).expect("write");

    let marker = read_marker(tmp.path(), project).expect("read").expect("present");
    assert_eq!(marker.pid, 2);
    assert_eq!(marker.port, 200);
}
