// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project Host Loop (spec §4.G): the periodic scan that discovers
//! projects under the configured hub roots, pulls any cloud documents
//! missing locally, keeps a sync server alive per project, and pushes a
//! catalog manifest to the relay so it knows what this machine can bridge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use magent_config::{discover_projects, enumerate_documents, ProjectDir};
use magent_core::{CatalogEntry, Clock, MachineId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync_pool::{SyncPool, SyncPoolError};

#[derive(Debug, Error)]
pub enum HostLoopError {
    #[error(transparent)]
    SyncPool(#[from] SyncPoolError),
}

/// A project this loop currently hosts, recorded so the Tunnel Provider can
/// resolve a `bridge-request`'s local sync URL (spec §4.E, §4.F) without
/// needing its own copy of the hub scan.
#[derive(Debug, Clone)]
pub struct ActiveProject {
    pub dir: PathBuf,
    pub sync_port: u16,
}

/// Shared between the Host Loop (writer) and the Tunnel Provider (reader).
pub type ActiveProjects = Arc<Mutex<HashMap<String, ActiveProject>>>;

#[derive(Debug, Clone)]
pub struct HostLoopConfig {
    pub cloud_url: String,
    pub hub_roots: Vec<PathBuf>,
    pub user_id: String,
    pub token: String,
    pub machine_id: MachineId,
    pub machine_name: String,
    pub hostname: String,
    pub capabilities: Vec<String>,
    pub scan_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentsResponse {
    documents: Vec<CloudDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudDocument {
    doc_path: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPushBody<'a> {
    machine_name: &'a str,
    hostname: &'a str,
    capabilities: &'a [String],
    entries: &'a [CatalogEntry],
}

pub struct HostLoop<C: Clock + 'static> {
    config: HostLoopConfig,
    sync_pool: Arc<SyncPool<C>>,
    active_projects: ActiveProjects,
    http_client: reqwest::Client,
    destroyed: AtomicBool,
}

impl<C: Clock + 'static> HostLoop<C> {
    pub fn new(config: HostLoopConfig, sync_pool: Arc<SyncPool<C>>, active_projects: ActiveProjects) -> Arc<Self> {
        Arc::new(Self {
            config,
            sync_pool,
            active_projects,
            http_client: reqwest::Client::new(),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn stop(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        // Best-effort release of every project this loop still holds a
        // reference to; see the acquire-every-scan note on `scan_once` for
        // why this is one release per project rather than one per acquire.
        for (_, project) in self.active_projects.lock().drain() {
            self.sync_pool.release(&project.dir);
        }
    }

    /// Scan on [`HostLoopConfig::scan_interval`] until [`stop`](Self::stop).
    pub async fn run(self: Arc<Self>) {
        loop {
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            self.scan_once().await;
            if self.destroyed.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    async fn scan_once(&self) {
        let projects = discover_projects(&self.config.hub_roots);
        let mut entries = Vec::new();

        for project in &projects {
            if let Err(err) = self.host_project(project).await {
                tracing::warn!(project = %project.name, error = %err, "failed to host project this scan");
                continue;
            }
            for doc_path in enumerate_documents(&project.path) {
                entries.push(CatalogEntry { project: project.name.clone(), doc_path });
            }
        }

        self.push_catalog(entries).await;
    }

    /// Steps 2-4: pull missing cloud documents, acquire a sync server, and
    /// record the project as hosted so `bridge-request` can be resolved.
    async fn host_project(&self, project: &ProjectDir) -> Result<(), HostLoopError> {
        self.pull_missing_documents(project).await;

        // spec §4.G.3: the acquire happens every scan, deliberately
        // incrementing the refcount each time — balanced by a single
        // release when this loop stops or the project drops out of the
        // hub roots, not one release per acquire.
        let server = self.sync_pool.acquire(&project.path).await?;
        self.active_projects
            .lock()
            .insert(project.name.clone(), ActiveProject { dir: project.path.clone(), sync_port: server.port });
        Ok(())
    }

    async fn pull_missing_documents(&self, project: &ProjectDir) {
        let url = format!("{}/api/sync/documents?project={}&content=1", self.config.cloud_url, project.name);
        let response = match self
            .http_client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(project = %project.name, error = %err, "cloud document fetch failed");
                return;
            }
        };
        let body = match response.json::<DocumentsResponse>().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(project = %project.name, error = %err, "malformed cloud documents response");
                return;
            }
        };

        for document in body.documents {
            if let Err(err) = write_missing_document(&project.path, &document.doc_path, &document.content) {
                tracing::warn!(
                    project = %project.name,
                    doc_path = %document.doc_path,
                    error = %err,
                    "failed to write pulled document"
                );
            }
        }
    }

    async fn push_catalog(&self, entries: Vec<CatalogEntry>) {
        let url =
            format!("{}/api/catalog/{}/{}", self.config.cloud_url, self.config.user_id, self.config.machine_id);
        let body = CatalogPushBody {
            machine_name: &self.config.machine_name,
            hostname: &self.config.hostname,
            capabilities: &self.config.capabilities,
            entries: &entries,
        };
        let result = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .timeout(Duration::from_secs(15))
            .json(&body)
            .send()
            .await;
        if let Err(err) = result {
            tracing::warn!(error = %err, "catalog push failed");
        }
    }
}

fn write_missing_document(project_dir: &Path, doc_path: &str, content: &str) -> std::io::Result<()> {
    let path = project_dir.join(format!("{doc_path}.md"));
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

#[cfg(test)]
#[path = "host_loop_tests.rs"]
mod tests;
