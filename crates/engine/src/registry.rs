// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime Registry (spec §4.C): resolves a language + session name into a
//! live `RuntimeSession`, spawning or re-adopting as needed, and mirrors
//! every live session to disk so a restarted daemon can reconcile.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use magent_adapters::{runtimes, ExitReport, PortBrokerError, ProcessDescriptor, ProcessHandle, Supervisor, SupervisorError};
use magent_core::runtime::ExecutableResolution;
use magent_core::{Clock, LanguageKey, RuntimeDescriptor, RuntimeSession, SessionName};
use magent_storage::{SessionStore, SessionStoreError};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("language unavailable: {0}")]
    LanguageUnavailable(String),
    #[error("pre-start action failed for {language}: {reason}")]
    PreStartFailed { language: String, reason: String },
    #[error(transparent)]
    PortBroker(#[from] PortBrokerError),
    #[error(transparent)]
    Spawn(#[from] SupervisorError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
    #[error("session {0} not found")]
    NotFound(String),
}

/// Request to start (or re-use) a runtime session.
#[derive(Debug, Clone)]
pub struct StartConfig {
    pub session_name: SessionName,
    pub language_key: String,
    pub cwd: Option<PathBuf>,
    pub venv: Option<PathBuf>,
}

struct LiveSession {
    session: RuntimeSession,
    config: StartConfig,
    /// `None` for a session this process didn't itself spawn — reserved
    /// for future adoption support; today every registry entry is spawned
    /// by this process, since (unlike the Sync Pool) no on-disk PID+port
    /// marker format is defined for runtime sessions beyond the session
    /// mirror itself, which this process always owns while the session is
    /// alive.
    handle: Option<Arc<ProcessHandle>>,
}

/// Whether the registry's packaged-build executable resolution should look
/// for a bundled interpreter alongside the current binary, and where.
#[derive(Debug, Clone)]
pub struct PackagingConfig {
    pub packaged: bool,
    pub bundle_dir: PathBuf,
}

pub struct Registry<C: Clock> {
    descriptors: Vec<RuntimeDescriptor>,
    supervisor: Supervisor,
    store: SessionStore,
    packaging: PackagingConfig,
    clock: C,
    sessions: Mutex<HashMap<String, LiveSession>>,
}

fn find_descriptor<'a>(descriptors: &'a [RuntimeDescriptor], key: &str) -> Option<&'a RuntimeDescriptor> {
    descriptors.iter().find(|d| d.matches(key))
}

/// The Open Question on pre-start semantics (spec §9) asks only for
/// idempotence and a loud failure when the post-condition isn't met. Since
/// `validate()` already is the post-condition check, pre-start here is the
/// identity operation for every built-in descriptor: there's nothing to
/// install beyond what `uvx`/`npx` already fetch lazily on first spawn.
/// A language whose interpreter genuinely needs a one-time install step
/// would plug in here without changing the caller.
fn pre_start(_descriptor: &RuntimeDescriptor) -> Result<(), RegistryError> {
    Ok(())
}

impl<C: Clock> Registry<C> {
    pub fn new(store: SessionStore, packaging: PackagingConfig, clock: C) -> Self {
        Self::with_descriptors(runtimes::builtin_descriptors(), store, packaging, clock)
    }

    /// As [`Registry::new`], but with an explicit descriptor set — used by
    /// tests to register a descriptor whose resolved executable is a
    /// throwaway script instead of a real language runtime.
    pub fn with_descriptors(
        descriptors: Vec<RuntimeDescriptor>,
        store: SessionStore,
        packaging: PackagingConfig,
        clock: C,
    ) -> Self {
        Self { descriptors, supervisor: Supervisor::new(), store, packaging, clock, sessions: Mutex::new(HashMap::new()) }
    }

    /// Reconcile the in-memory map with the on-disk mirror at startup:
    /// load every file, evict (and unlink) anything whose PID is dead.
    /// Since this process can't hold a `ProcessHandle` for a session it
    /// didn't spawn, reconciled sessions are adopted as handle-less:
    /// `list()` keeps probing their liveness by PID.
    pub fn reconcile(&self) {
        let records = match self.store.load_all() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(%err, "failed to load session registry mirror");
                return;
            }
        };
        let mut sessions = self.sessions.lock();
        for mut session in records {
            if !self.supervisor.is_alive(session.pid) {
                let _ = self.store.remove(&SessionName::from_raw(&session.name).file_name());
                continue;
            }
            session.alive = true;
            let config = StartConfig {
                session_name: SessionName::from_raw(&session.name),
                language_key: session.language.as_str().to_string(),
                cwd: Some(session.cwd.clone()),
                venv: session.venv_path.clone(),
            };
            sessions.insert(session.name.clone(), LiveSession { session, config, handle: None });
        }
    }

    /// Returns live sessions, optionally filtered by language. Probes every
    /// session's PID first and evicts (unlinking the mirror file) anything
    /// dead — spec §8 invariant 2.
    pub fn list(&self, language: Option<&str>) -> Vec<RuntimeSession> {
        let mut dead = Vec::new();
        let mut sessions = self.sessions.lock();
        sessions.retain(|name, live| {
            let alive = self.supervisor.is_alive(live.session.pid);
            if !alive {
                dead.push(name.clone());
            }
            alive
        });
        for name in &dead {
            let _ = self.store.remove(&SessionName::from_raw(name).file_name());
        }
        sessions
            .values()
            .map(|live| live.session.clone())
            .filter(|s| language.is_none_or(|lang| s.language.as_str() == lang))
            .collect()
    }

    /// Start (or return the existing live) session named in `config`.
    pub async fn start(&self, config: StartConfig) -> Result<RuntimeSession, RegistryError> {
        let name = config.session_name.as_str().to_string();

        if let Some(session) = self.sessions.lock().get(&name).map(|live| live.session.clone()) {
            if self.supervisor.is_alive(session.pid) {
                return Ok(session);
            }
        }

        let descriptor = find_descriptor(&self.descriptors, &config.language_key)
            .ok_or_else(|| RegistryError::UnknownLanguage(config.language_key.clone()))?
            .clone();

        let resolution = runtimes::resolve_executable(
            descriptor.language.as_str(),
            self.packaging.packaged,
            &self.packaging.bundle_dir,
        );
        let validation = runtimes::validate(&resolution);
        if !validation.available {
            return Err(RegistryError::LanguageUnavailable(
                validation.reason.unwrap_or_else(|| descriptor.language.to_string()),
            ));
        }

        pre_start(&descriptor).map_err(|_| RegistryError::PreStartFailed {
            language: descriptor.language.to_string(),
            reason: "post-condition not met".to_string(),
        })?;

        let port = magent_adapters::allocate().await?;
        let cwd = config.cwd.clone().or_else(|| descriptor.cwd_override.clone());

        let mut proc_descriptor = match &resolution {
            ExecutableResolution::Direct { executable, args } => {
                let mut d = ProcessDescriptor::new(executable.clone(), name.clone());
                for arg in args {
                    d = d.with_arg(arg.clone());
                }
                d
            }
            ExecutableResolution::Wrapped { runner, args } => {
                let mut d = ProcessDescriptor::new(runner.clone(), name.clone());
                for arg in args {
                    d = d.with_arg(arg.clone());
                }
                d
            }
        };
        proc_descriptor = proc_descriptor.with_arg("--port").with_arg(port.to_string());
        if let Some(cwd) = &cwd {
            proc_descriptor = proc_descriptor.with_cwd(cwd.clone());
        }
        for (key, value) in &descriptor.env_overlay {
            proc_descriptor = proc_descriptor.with_env(key.clone(), value.clone());
        }
        if let Some(venv) = &config.venv {
            proc_descriptor = proc_descriptor.with_env("VIRTUAL_ENV", venv.display().to_string());
        }

        let handle = Arc::new(self.supervisor.spawn(proc_descriptor)?);

        // `ProcessHandle::on_exit` hands back its receiver only once, so a
        // single background task owns that call for the handle's whole
        // life; everyone else (this start-up race, and the later eviction
        // watcher) reads the outcome through a `watch` channel, which keeps
        // the latest value for late subscribers instead of requiring anyone
        // to be polling at the exact moment the child dies.
        let (exit_tx, mut exit_rx) = tokio::sync::watch::channel(None::<ExitReport>);
        let watched_handle = Arc::clone(&handle);
        tokio::spawn(async move {
            let report = watched_handle.on_exit().await;
            let _ = exit_tx.send(report);
        });

        let wait = magent_adapters::wait_for_listening(port, descriptor.startup_timeout, magent_adapters::localhost());
        tokio::select! {
            result = wait => {
                if let Err(err) = result {
                    self.supervisor.mark_expected_exit(&handle);
                    self.supervisor.kill(&handle);
                    return Err(err.into());
                }
            }
            _ = exit_rx.changed() => {
                return Err(RegistryError::Spawn(SupervisorError::SpawnFailed {
                    program: descriptor.language.to_string(),
                    source: std::io::Error::other("child exited before listening"),
                }));
            }
        }

        let session = RuntimeSession {
            name: name.clone(),
            language: descriptor.language.clone(),
            pid: handle.pid,
            port,
            cwd: cwd.unwrap_or_else(|| PathBuf::from(".")),
            venv_path: config.venv.clone(),
            started_at_ms: self.clock.epoch_ms(),
            alive: true,
            extra: runtimes::extra_info(descriptor.language.as_str(), port),
        };
        self.store.save(&config.session_name.file_name(), &session)?;

        self.sessions.lock().insert(
            name.clone(),
            LiveSession { session: session.clone(), config: config.clone(), handle: Some(Arc::clone(&handle)) },
        );

        self.spawn_exit_watcher(name, config.session_name.file_name(), exit_rx);

        Ok(session)
    }

    fn spawn_exit_watcher(&self, name: String, file_name: String, mut exit_rx: tokio::sync::watch::Receiver<Option<ExitReport>>) {
        let store_dir = self.store.dir().to_path_buf();
        tokio::spawn(async move {
            // The watch channel already holds `None` until the handle's
            // single `on_exit` task resolves, so a plain `changed()` wait
            // is enough even if the session died before this task started.
            if exit_rx.changed().await.is_err() {
                return;
            }
            let path = store_dir.join(&file_name);
            let _ = std::fs::remove_file(&path);
            tracing::info!(session = %name, "runtime session exited, evicted from registry");
        });
    }

    pub fn stop(&self, name: &str) {
        let live = self.sessions.lock().remove(name);
        if let Some(live) = live {
            if let Some(handle) = &live.handle {
                self.supervisor.mark_expected_exit(handle);
                self.supervisor.kill(handle);
            }
            let _ = self.store.remove(&SessionName::from_raw(name).file_name());
        }
    }

    /// Stop then re-start a session with its original config, waiting for
    /// the port to fully release (spec §4.C).
    pub async fn restart(&self, name: &str) -> Result<RuntimeSession, RegistryError> {
        let config = {
            let sessions = self.sessions.lock();
            sessions.get(name).map(|live| live.config.clone())
        }
        .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.stop(name);
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.start(config).await
    }

    /// spec §4.C `getForDocument`: resolve every supported language for
    /// `doc_path` within `project_root` and return whichever of them are
    /// live (or auto-started). "Supported" means this registry's own
    /// built-in descriptor set — a document only gets a session for a
    /// language this machine actually knows how to run, regardless of
    /// what its frontmatter happens to mention.
    pub async fn get_for_document(
        &self,
        doc_path: &std::path::Path,
        project_config: &magent_config::ProjectConfig,
        frontmatter: &magent_config::Frontmatter,
        project_root: &std::path::Path,
    ) -> Vec<RuntimeSession> {
        let project_name = project_root.file_name().and_then(|n| n.to_str()).unwrap_or("project");
        let languages: Vec<LanguageKey> = self.descriptors.iter().map(|d| d.language.clone()).collect();
        let mut sessions = Vec::new();
        for language in languages {
            let resolution = magent_config::resolve_session_name(project_name, &language, project_config, frontmatter);
            match self
                .get_for_document_language(&language, resolution, Some(project_root.to_path_buf()))
                .await
            {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(doc = %doc_path.display(), %language, %err, "language unavailable for document");
                }
            }
        }
        sessions
    }

    /// Single-language variant of `getForDocumentLanguage` (spec §4.C):
    /// resolve `language` for a document and either return the live
    /// session or start it (synchronously, except Julia which the caller
    /// is expected to fire via `tokio::spawn` itself so a slow JIT start
    /// doesn't block the caller — that policy lives one layer up, in the
    /// tunnel/host-loop code that actually has a "caller" to avoid
    /// blocking).
    pub async fn get_for_document_language(
        &self,
        language: &LanguageKey,
        resolution: magent_config::resolve::DocumentLanguageResolution,
        cwd: Option<PathBuf>,
    ) -> Result<Option<RuntimeSession>, RegistryError> {
        let name = resolution.session_name.as_str().to_string();
        if let Some(session) = self.sessions.lock().get(&name).map(|live| live.session.clone()) {
            if self.supervisor.is_alive(session.pid) {
                return Ok(Some(session));
            }
        }
        if !resolution.auto_start {
            return Ok(None);
        }
        let config = StartConfig {
            session_name: resolution.session_name,
            language_key: language.as_str().to_string(),
            cwd,
            venv: None,
        };
        self.start(config).await.map(Some)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
