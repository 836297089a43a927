// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magent bridges` - list active document bridges for a project.

use crate::client::AdminClient;
use crate::output::{format_or_json, OutputFormat};
use anyhow::{anyhow, Result};

pub async fn bridges(project: String, format: OutputFormat) -> Result<()> {
    let mut client = AdminClient::connect().await.map_err(|_| anyhow!("daemon not running"))?;
    let bridges = client.bridges(project).await.map_err(|e| anyhow!("{e}"))?;

    format_or_json(format, &bridges, || {
        if bridges.is_empty() {
            println!("No document bridges for this project.");
            return;
        }
        for bridge in &bridges {
            let state = match (bridge.connected, bridge.reconnecting) {
                (true, _) => "connected",
                (false, true) => "reconnecting",
                (false, false) => "disconnected",
            };
            println!(
                "{:<32} local={} remote={} {}",
                bridge.doc_name, bridge.local_ready, bridge.remote_ready, state
            );
            if let Some(err) = &bridge.last_error {
                println!("  last error: {}", crate::color::context(err));
            }
        }
    })
}
