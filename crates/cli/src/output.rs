// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use fleet_core::{format_elapsed_ms, TaskEvent};
use fleet_wire::StatusSnapshot;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Render the worker table and in-flight tasks.
///
/// Plain text; callers color it only when writing to a terminal.
pub fn format_status(status: &StatusSnapshot, now_ms: u64) -> String {
    let mut out = String::new();
    if status.workers.is_empty() {
        out.push_str("No workers registered\n");
        return out;
    }

    let name_w = status.workers.iter().map(|w| w.name.as_str().len()).max().unwrap_or(0).max(6);
    let endpoint_w = status.workers.iter().map(|w| w.endpoint.len()).max().unwrap_or(0).max(8);
    out.push_str(&format!(
        "{:<name_w$}  {:<endpoint_w$}  {:<8}  TASK\n",
        "WORKER", "ENDPOINT", "STATE"
    ));
    for worker in &status.workers {
        let task = worker.task_id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        out.push_str(&format!(
            "{:<name_w$}  {:<endpoint_w$}  {:<8}  {}\n",
            worker.name.as_str(),
            worker.endpoint,
            worker.state().to_string(),
            task
        ));
    }

    out.push_str(&format!(
        "\n{} available, {} running\n",
        status.available_count(),
        status.active_task_count()
    ));
    for task in &status.tasks {
        let elapsed = format_elapsed_ms(now_ms.saturating_sub(task.started_at_ms));
        out.push_str(&format!(
            "  {}  {}  {} ({}s, running {})\n",
            task.id, task.worker, task.target, task.duration_secs, elapsed
        ));
    }
    out
}

pub fn print_status(status: &StatusSnapshot, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
        OutputFormat::Text => {
            for line in format_status(status, now_ms()).lines() {
                println!("{}", colorize_status_line(line));
            }
        }
    }
    Ok(())
}

fn colorize_status_line(line: &str) -> String {
    if line.starts_with("WORKER") {
        return color::header(line);
    }
    if line.starts_with("  ") {
        return color::context(line);
    }
    if line.starts_with("No workers") {
        return color::muted(line);
    }
    line.to_string()
}

/// One line per event: JSON for scripts, otherwise the log summary.
pub fn format_event(event: &TaskEvent, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(event)?,
        OutputFormat::Text => event.log_summary(),
    })
}
