// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event stream handler

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{format_event, OutputFormat};

/// Print task events until interrupted or the dispatcher stops.
pub async fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let mut events = client.watch().await?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            next = events.next() => match next {
                Some(event) => println!("{}", format_event(&event?, format)?),
                None => {
                    eprintln!("dispatcher closed the event stream");
                    return Ok(());
                }
            },
        }
    }
}
