// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port Broker (spec §4.A): ephemeral port allocation and liveness probing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum PortBrokerError {
    #[error("failed to bind ephemeral port: {0}")]
    BindFailed(std::io::Error),
    #[error("port {port} never started listening within {timeout_ms}ms")]
    PortNotReady { port: u16, timeout_ms: u128 },
}

/// Ask the OS for an unused loopback port by binding `:0`, reading back the
/// assigned port, then immediately releasing the listener.
pub async fn allocate() -> Result<u16, PortBrokerError> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = TcpListener::bind(addr).await.map_err(PortBrokerError::BindFailed)?;
    let port = listener.local_addr().map_err(PortBrokerError::BindFailed)?.port();
    drop(listener);
    Ok(port)
}

/// A single short-timeout TCP connect probe.
pub async fn is_listening(port: u16, host: IpAddr) -> bool {
    let addr = SocketAddr::new(host, port);
    matches!(timeout(CONNECT_PROBE_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Poll `is_listening` at `DEFAULT_PROBE_INTERVAL` until it succeeds or
/// `wait_timeout` elapses.
pub async fn wait_for_listening(
    port: u16,
    wait_timeout: Duration,
    host: IpAddr,
) -> Result<(), PortBrokerError> {
    let deadline = tokio::time::Instant::now() + wait_timeout;
    loop {
        if is_listening(port, host).await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(PortBrokerError::PortNotReady { port, timeout_ms: wait_timeout.as_millis() });
        }
        tokio::time::sleep(DEFAULT_PROBE_INTERVAL).await;
    }
}

/// Loopback host shorthand used throughout the agent.
pub fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

#[cfg(test)]
#[path = "port_broker_tests.rs"]
mod tests;
