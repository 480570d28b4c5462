// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status command handler

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{print_status, OutputFormat};

pub async fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;
    print_status(&status, format)
}
