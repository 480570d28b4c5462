// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enable/disable handlers

use anyhow::Result;

use crate::client::DaemonClient;
use crate::color;

pub async fn set_enabled(client: &DaemonClient, worker: &str, enabled: bool) -> Result<()> {
    client.set_enabled(worker, enabled).await?;
    let verb = if enabled { "enabled" } else { "disabled" };
    println!("Worker '{}' {}", color::header(worker), verb);
    Ok(())
}
