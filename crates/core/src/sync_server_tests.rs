// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn owned_server_starts_with_refcount_one() {
    let server = SyncServer::owned(PathBuf::from("/proj"), 5555, 111);
    assert_eq!(server.refcount, 1);
    assert!(server.owned);
    assert!(!server.expected_exit);
}

#[test]
fn adopted_server_is_not_owned() {
    let server = SyncServer::adopted(PathBuf::from("/proj"), 5555, 222);
    assert!(!server.owned);
}

#[test]
fn release_reports_refcount_hitting_zero_regardless_of_ownership() {
    let mut owned = SyncServer::owned(PathBuf::from("/proj"), 1, 1);
    owned.acquire();
    owned.acquire();
    assert!(!owned.release());
    assert!(!owned.release());
    assert!(owned.release());

    // Adopted servers are not killed by the pool, but an empty entry is an
    // empty entry either way — release() reports it the same as owned.
    let mut adopted = SyncServer::adopted(PathBuf::from("/proj"), 1, 1);
    assert!(adopted.release());
}

#[test]
fn marker_roundtrips_through_json() {
    let marker = SyncServerMarker { pid: 9, port: 4242 };
    let json = serde_json::to_string(&marker).expect("serialize");
    let back: SyncServerMarker = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.pid, 9);
    assert_eq!(back.port, 4242);
}
