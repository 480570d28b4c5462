// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task submission and cancellation handlers

use anyhow::Result;
use clap::Args;
use fleet_core::{parse_duration_secs, TaskSpec};

use crate::client::DaemonClient;
use crate::color;

/// Task arguments shared by `submit` and `submit-all`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TaskArgs {
    /// Target handed to the payload as its first argument
    pub target: String,
    /// How long the payload should run (`90`, `30s`, `5m`, `2h`)
    #[arg(value_parser = parse_duration)]
    pub duration: u64,
    /// Extra arguments passed through to the payload
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl TaskArgs {
    pub fn spec(&self) -> TaskSpec {
        TaskSpec::new(self.target.clone(), self.duration).args(self.args.clone())
    }
}

fn parse_duration(s: &str) -> Result<u64, String> {
    parse_duration_secs(s).map_err(|e| e.to_string())
}

pub async fn submit(client: &DaemonClient, args: TaskArgs) -> Result<()> {
    let (task_id, worker) = client.submit(args.spec()).await?;
    println!("Submitted {} to {}", task_id, color::header(worker.as_str()));
    Ok(())
}

pub async fn submit_all(client: &DaemonClient, args: TaskArgs) -> Result<()> {
    let task_ids = client.submit_all(args.spec()).await?;
    println!("Launched on {} worker(s)", task_ids.len());
    for id in &task_ids {
        println!("  {}", color::context(id.as_str()));
    }
    Ok(())
}

pub async fn cancel(client: &DaemonClient, task_id: &str) -> Result<()> {
    client.cancel(task_id).await?;
    println!("Cancelled {}", task_id);
    Ok(())
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
