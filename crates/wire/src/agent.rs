// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-control protocol between the dispatcher and a worker agent.
//!
//! After `Hello`, the dispatcher sends one `Execute` or `Cancel`. An accepted
//! `Execute` keeps the connection open: the agent streams `Progress` frames
//! and finishes with exactly one `Completed`.

use fleet_core::{TaskId, TaskSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AgentRequest {
    Hello { version: String, token: String },
    Execute { task_id: TaskId, task: TaskSpec },
    Cancel { task_id: TaskId },
}

/// Why an agent refused to start a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorKind {
    InvalidTask,
    PayloadMissing,
    WorkerBusy,
    SpawnFailed,
}

fleet_core::simple_display! {
    AgentErrorKind {
        InvalidTask => "invalid task",
        PayloadMissing => "payload missing",
        WorkerBusy => "worker busy",
        SpawnFailed => "spawn failed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AgentResponse {
    Hello { version: String },
    /// Subprocess started; events follow on this connection
    Accepted { task_id: TaskId },
    /// No subprocess was started
    Rejected { kind: AgentErrorKind, message: String },
    Progress { task_id: TaskId, message: String },
    Completed { task_id: TaskId, exit_code: Option<i32> },
    /// Reply to `Cancel`; `found` is false when the task was not running
    Cancelled { task_id: TaskId, found: bool },
}
