// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magent stop` - ask a running daemon to shut down gracefully.

use crate::client::AdminClient;
use anyhow::{anyhow, Result};

pub async fn stop() -> Result<()> {
    let mut client = match AdminClient::connect().await {
        Ok(client) => client,
        Err(_) => {
            println!("Daemon not running");
            return Ok(());
        }
    };

    client.shutdown().await.map_err(|e| anyhow!("failed to stop daemon: {e}"))?;
    println!("Daemon stopping");
    Ok(())
}
