// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::{TaskEvent, TaskId, WorkerName};
use serde::{Deserialize, Serialize};

use super::StatusSnapshot;

/// Category of a failed operator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed arguments
    Validation,
    /// No enabled worker is idle
    Capacity,
    UnknownWorker,
    UnknownTask,
    /// Forwarding to a worker failed
    Transport,
}

fleet_core::simple_display! {
    ErrorKind {
        Validation => "validation",
        Capacity => "capacity",
        UnknownWorker => "unknown worker",
        UnknownTask => "unknown task",
        Transport => "transport",
    }
}

/// Response from the dispatcher to the operator CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Handshake accepted
    Hello { version: String },

    /// A single task was handed to a worker
    Submitted { task_id: TaskId, worker: WorkerName },

    /// Broadcast result: how many workers took the task
    Launched { count: usize, task_ids: Vec<TaskId> },

    Status { status: StatusSnapshot },

    /// One streamed event (for `Watch`)
    Event { event: TaskEvent },

    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }
}
