// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-task payload output.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current UTC time as `2026-01-30T08:14:09Z`.
pub fn format_utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Writes timestamped payload output to `<log_dir>/task/<task_id>.log`.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    log_dir: PathBuf,
}

impl TaskLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_path(&self, task_id: &str) -> PathBuf {
        self.log_dir.join("task").join(format!("{task_id}.log"))
    }

    /// Open (or create) the log for one task.
    ///
    /// Failures are traced and yield a log that discards writes; logging
    /// must never stop a task.
    pub fn open(&self, task_id: &str) -> TaskLog {
        let path = self.log_path(task_id);
        let file = match open_append(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(
                    task_id,
                    path = %path.display(),
                    error = %e,
                    "failed to open task log"
                );
                None
            }
        };
        TaskLog { task_id: task_id.to_string(), file }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Handle to one task's log file.
pub struct TaskLog {
    task_id: String,
    file: Option<File>,
}

impl TaskLog {
    /// Append one line tagged with its source (`stdout`, `stderr`, `agent`).
    ///
    /// Format: `2026-01-30T08:14:09Z [stdout] line`
    pub fn line(&mut self, source: &str, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(file, "{} [{}] {}", format_utc_now(), source, text) {
            tracing::warn!(task_id = %self.task_id, error = %e, "failed to write task log");
            // Stop trying after the first failure
            self.file = None;
        }
    }
}

#[cfg(test)]
#[path = "task_log_tests.rs"]
mod tests;
