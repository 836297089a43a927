// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magentd` — the Machine Agent daemon binary entry point.

use std::sync::Arc;

use magent_daemon::listener::AdminContext;
use magent_daemon::{listener, shutdown, startup, Config, LifecycleError};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("magentd: startup failed: {err}");
            return 1;
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "magentd.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .init();

    let socket_path = config.socket_path.clone();
    let result = match startup(config).await {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(path)) => {
            eprintln!("magentd: another daemon already holds the lock at {}", path.display());
            return 2;
        }
        Err(err) => {
            eprintln!("magentd: startup failed: {err}");
            return 1;
        }
    };

    let admin_listener = match listener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("magentd: failed to bind admin socket at {}: {err}", socket_path.display());
            shutdown(result.daemon).await;
            return 1;
        }
    };

    let admin_context = Arc::new(AdminContext::from_daemon(&result.daemon));
    let admin_shutdown = Arc::new(Notify::new());
    let admin_task = tokio::spawn(listener::run(admin_listener, admin_context, Arc::clone(&admin_shutdown)));

    wait_for_shutdown_signal(Arc::clone(&admin_shutdown)).await;
    admin_task.abort();

    shutdown(result.daemon).await;

    0
}

/// Wait for SIGINT/SIGTERM, or for the admin listener to relay a CLI-issued
/// `Shutdown` request — whichever comes first (spec §6, SPEC_FULL §10.6).
#[allow(clippy::expect_used)]
async fn wait_for_shutdown_signal(admin_shutdown: Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
            _ = admin_shutdown.notified() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = ctrl_c => {}
            _ = admin_shutdown.notified() => {}
        }
    }
}
