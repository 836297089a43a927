// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magent runtimes` - list runtime sessions the Runtime Registry tracks.

use crate::client::AdminClient;
use crate::output::{format_or_json, OutputFormat};
use anyhow::{anyhow, Result};

pub async fn runtimes(project: Option<String>, format: OutputFormat) -> Result<()> {
    let mut client = AdminClient::connect().await.map_err(|_| anyhow!("daemon not running"))?;
    let runtimes = client.runtimes(project).await.map_err(|e| anyhow!("{e}"))?;

    format_or_json(format, &runtimes, || {
        if runtimes.is_empty() {
            println!("No runtime sessions.");
            return;
        }
        println!("{:<28} {:<8} {:>8} {:>6}  STATE", "NAME", "LANG", "PID", "PORT");
        for runtime in &runtimes {
            let state = if runtime.alive { "alive" } else { "dead" };
            println!("{:<28} {:<8} {:>8} {:>6}  {}", runtime.name, runtime.language, runtime.pid, runtime.port, state);
        }
    })
}
