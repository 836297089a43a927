// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client for the local admin socket that `magentd` listens on
//! (SPEC_FULL §10.6). One request per round trip, using the same
//! length-prefixed JSON framing the daemon uses for its own IPC.

use std::path::PathBuf;

use magent_wire::{read_request, write_response, AdminRequest, AdminResponse, ProtocolError};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running")]
    NotRunning,
    #[error("could not determine a state directory: $HOME is unset")]
    NoStateDir,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned an error: {0}")]
    Remote(String),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning)
    }
}

pub struct AdminClient {
    stream: UnixStream,
}

impl AdminClient {
    /// Connect to the admin socket at its conventional, state-dir-derived
    /// path (the same path `magentd::Config` binds at startup).
    pub async fn connect() -> Result<Self, ClientError> {
        let socket_path = socket_path()?;
        Self::connect_at(&socket_path).await
    }

    pub async fn connect_at(socket_path: &std::path::Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|_| ClientError::NotRunning)?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, request: &AdminRequest) -> Result<AdminResponse, ClientError> {
        write_response(&mut self.stream, request).await?;
        let response: AdminResponse = read_request(&mut self.stream).await?;
        match response {
            AdminResponse::Error { message } => Err(ClientError::Remote(message)),
            other => Ok(other),
        }
    }

    pub async fn ping(&mut self) -> Result<String, ClientError> {
        match self.send(&AdminRequest::Ping).await? {
            AdminResponse::Pong { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&mut self) -> Result<(u64, Vec<magent_wire::ProjectAdminSummary>), ClientError> {
        match self.send(&AdminRequest::Status).await? {
            AdminResponse::Status { uptime_secs, projects } => Ok((uptime_secs, projects)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn runtimes(&mut self, project: Option<String>) -> Result<Vec<magent_wire::RuntimeAdminSummary>, ClientError> {
        match self.send(&AdminRequest::ListRuntimes { project }).await? {
            AdminResponse::Runtimes { runtimes } => Ok(runtimes),
            other => Err(unexpected(other)),
        }
    }

    pub async fn bridges(&mut self, project: String) -> Result<Vec<magent_core::BridgeStatus>, ClientError> {
        match self.send(&AdminRequest::ListBridges { project }).await? {
            AdminResponse::Bridges { bridges } => Ok(bridges),
            other => Err(unexpected(other)),
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        match self.send(&AdminRequest::Shutdown).await? {
            AdminResponse::ShuttingDown | AdminResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: AdminResponse) -> ClientError {
    ClientError::Remote(format!("unexpected response: {response:?}"))
}

fn socket_path() -> Result<PathBuf, ClientError> {
    let state_dir = magent_daemon::env::state_dir().map_err(|_| ClientError::NoStateDir)?;
    Ok(state_dir.join("daemon.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use magent_wire::{AdminResponse, ProjectAdminSummary};
    use tempfile::TempDir;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn connect_at_fails_with_not_running_when_nothing_is_listening() {
        let dir = TempDir::new().expect("tempdir");
        let socket_path = dir.path().join("ghost.sock");

        let err = AdminClient::connect_at(&socket_path).await.expect_err("should not connect");
        assert!(err.is_not_running());
    }

    #[tokio::test]
    async fn status_round_trips_through_the_socket() {
        let dir = TempDir::new().expect("tempdir");
        let socket_path = dir.path().join("admin.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let _request: AdminRequest = read_request(&mut stream).await.expect("read");
            let response = AdminResponse::Status {
                uptime_secs: 42,
                projects: vec![ProjectAdminSummary { name: "demo".into(), sync_port: Some(9999), bridge_count: 1, runtime_count: 2 }],
            };
            write_response(&mut stream, &response).await.expect("write");
        });

        let mut client = AdminClient::connect_at(&socket_path).await.expect("connect");
        let (uptime, projects) = client.status().await.expect("status");
        assert_eq!(uptime, 42);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "demo");

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn remote_error_response_surfaces_as_remote_error() {
        let dir = TempDir::new().expect("tempdir");
        let socket_path = dir.path().join("admin.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let _request: AdminRequest = read_request(&mut stream).await.expect("read");
            let response = AdminResponse::Error { message: "boom".to_string() };
            write_response(&mut stream, &response).await.expect("write");
        });

        let mut client = AdminClient::connect_at(&socket_path).await.expect("connect");
        let err = client.ping().await.expect_err("should surface remote error");
        assert!(matches!(err, ClientError::Remote(message) if message == "boom"));

        server.await.expect("server task");
    }
}
