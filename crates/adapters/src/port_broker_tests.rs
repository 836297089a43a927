// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn allocate_returns_a_bindable_port() {
    let port = allocate().await.expect("allocate");
    assert_ne!(port, 0);
}

#[tokio::test]
async fn is_listening_true_once_something_binds() {
    let listener = TcpListener::bind((localhost(), 0)).await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    assert!(is_listening(port, localhost()).await);
    drop(listener);
}

#[tokio::test]
async fn is_listening_false_for_unbound_port() {
    let port = allocate().await.expect("allocate");
    assert!(!is_listening(port, localhost()).await);
}

#[tokio::test]
async fn wait_for_listening_times_out_on_dead_port() {
    let port = allocate().await.expect("allocate");
    let err = wait_for_listening(port, Duration::from_millis(250), localhost())
        .await
        .expect_err("should time out");
    assert!(matches!(err, PortBrokerError::PortNotReady { .. }));
}

#[tokio::test]
async fn wait_for_listening_succeeds_once_port_opens() {
    let listener = TcpListener::bind((localhost(), 0)).await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let accept = tokio::spawn(async move {
        let _ = listener.accept().await;
    });
    wait_for_listening(port, Duration::from_secs(2), localhost()).await.expect("should succeed");
    let _ = accept.await;
}
