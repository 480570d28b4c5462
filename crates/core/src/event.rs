// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events produced while a task runs.
//!
//! [`ProgressEvent`] is what an agent observes from its subprocess.
//! [`TaskEvent`] is what the dispatcher publishes to operators.

use crate::task::TaskId;
use crate::worker::WorkerName;
use serde::{Deserialize, Serialize};

/// One item of a running task's event sequence.
///
/// A run yields any number of `Progress` events followed by exactly one
/// `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { message: String },
    /// `exit_code` is `None` when the subprocess was killed by a signal.
    Completed { exit_code: Option<i32> },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed { .. })
    }
}

/// Why a task's worker was handed back to the idle pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// The worker reported the subprocess finished.
    Completed,
    /// The expiry timer fired before any completion arrived.
    Expired,
    /// The worker was disabled while running the task.
    Disabled,
    /// An operator cancelled the task.
    Cancelled,
    /// The task never reached the worker.
    ForwardFailed,
}

crate::simple_display! {
    ReleaseReason {
        Completed => "completed",
        Expired => "expired",
        Disabled => "disabled",
        Cancelled => "cancelled",
        ForwardFailed => "forward_failed",
    }
}

/// Task lifecycle notifications relayed to operators.
///
/// Serializes with `{"type": "task:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    #[serde(rename = "task:assigned")]
    Assigned { id: TaskId, worker: WorkerName, target: String },

    #[serde(rename = "task:progress")]
    Progress { id: TaskId, worker: WorkerName, message: String },

    #[serde(rename = "task:completed")]
    Completed { id: TaskId, worker: WorkerName, exit_code: Option<i32> },

    #[serde(rename = "task:released")]
    Released { id: TaskId, worker: WorkerName, reason: ReleaseReason },

    #[serde(rename = "task:forward_failed")]
    ForwardFailed { id: TaskId, worker: WorkerName, error: String },
}

impl TaskEvent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            TaskEvent::Assigned { id, .. }
            | TaskEvent::Progress { id, .. }
            | TaskEvent::Completed { id, .. }
            | TaskEvent::Released { id, .. }
            | TaskEvent::ForwardFailed { id, .. } => id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Assigned { .. } => "task:assigned",
            TaskEvent::Progress { .. } => "task:progress",
            TaskEvent::Completed { .. } => "task:completed",
            TaskEvent::Released { .. } => "task:released",
            TaskEvent::ForwardFailed { .. } => "task:forward_failed",
        }
    }

    /// One-line human-readable rendering, used for logs and `fleet watch`.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            TaskEvent::Assigned { id, worker, target } => {
                format!("{t} id={id} worker={worker} target={target}")
            }
            TaskEvent::Progress { id, worker, message } => {
                format!("{t} id={id} worker={worker} {message}")
            }
            TaskEvent::Completed { id, worker, exit_code: Some(code) } => {
                format!("{t} id={id} worker={worker} exit={code}")
            }
            TaskEvent::Completed { id, worker, exit_code: None } => {
                format!("{t} id={id} worker={worker} exit=signal")
            }
            TaskEvent::Released { id, worker, reason } => {
                format!("{t} id={id} worker={worker} reason={reason}")
            }
            TaskEvent::ForwardFailed { id, worker, error } => {
                format!("{t} id={id} worker={worker} error={error}")
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
