// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `magent ping` - health check / version handshake.

use crate::client::AdminClient;
use crate::output::{format_or_json, OutputFormat};
use anyhow::{anyhow, Result};

pub async fn ping(format: OutputFormat) -> Result<()> {
    let mut client = AdminClient::connect().await.map_err(|_| anyhow!("daemon not running"))?;
    let version = client.ping().await.map_err(|e| anyhow!("{e}"))?;

    let obj = serde_json::json!({ "version": version });
    format_or_json(format, &obj, || println!("magentd {version}"))
}
