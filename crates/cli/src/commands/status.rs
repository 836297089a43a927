// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magent status` - cross-project overview of the running daemon.

use crate::client::AdminClient;
use crate::output::{format_or_json, OutputFormat};
use anyhow::{anyhow, Result};

pub async fn status(format: OutputFormat) -> Result<()> {
    let mut client = match AdminClient::connect().await {
        Ok(client) => client,
        Err(_) => return print_not_running(format),
    };

    let (uptime_secs, projects) = match client.status().await {
        Ok(result) => result,
        Err(e) if e.is_not_running() => return print_not_running(format),
        Err(e) => return Err(anyhow!("{e}")),
    };

    let obj = serde_json::json!({
        "status": "running",
        "uptime_secs": uptime_secs,
        "uptime": format_uptime(uptime_secs),
        "projects": projects,
    });
    format_or_json(format, &obj, || {
        println!("Status: running");
        println!("Uptime: {}", format_uptime(uptime_secs));
        if projects.is_empty() {
            println!("Projects: none active");
            return;
        }
        println!("\nProjects:");
        for project in &projects {
            let port = project.sync_port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  sync_port={}  bridges={}  runtimes={}",
                crate::color::header(&project.name),
                port,
                project.bridge_count,
                project.runtime_count,
            );
        }
    })
}

fn print_not_running(format: OutputFormat) -> Result<()> {
    let obj = serde_json::json!({ "status": "not_running" });
    format_or_json(format, &obj, || println!("Daemon not running"))
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
