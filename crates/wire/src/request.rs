// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::{TaskId, TaskSpec, WorkerName};
use serde::{Deserialize, Serialize};

/// Request from the operator CLI to the dispatcher.
///
/// A connection carries `Hello` followed by exactly one other request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Request {
    /// Version and credential handshake; must come first
    Hello { version: String, token: String },

    /// Health check ping
    Ping,

    /// Run a task on the first available worker
    Submit { task: TaskSpec },

    /// Run a task on every available worker
    SubmitAll { task: TaskSpec },

    /// Snapshot of workers and in-flight tasks
    Status,

    Enable { worker: WorkerName },

    Disable { worker: WorkerName },

    /// Stop a running task and free its worker
    Cancel { task_id: TaskId },

    /// Stream task events until the client disconnects
    Watch,
}

impl Request {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "hello",
            Request::Ping => "ping",
            Request::Submit { .. } => "submit",
            Request::SubmitAll { .. } => "submit_all",
            Request::Status => "status",
            Request::Enable { .. } => "enable",
            Request::Disable { .. } => "disable",
            Request::Cancel { .. } => "cancel",
            Request::Watch => "watch",
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
