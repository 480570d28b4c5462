// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshot types shared by the dispatcher and CLI.

use fleet_core::{TaskId, TaskRecord, WorkerName, WorkerRecord, WorkerState};
use serde::{Deserialize, Serialize};

/// Worker row in a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub name: WorkerName,
    pub endpoint: String,
    pub enabled: bool,
    pub busy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl WorkerEntry {
    pub fn from_record(record: &WorkerRecord, task_id: Option<TaskId>) -> Self {
        Self {
            name: record.name.clone(),
            endpoint: record.endpoint.clone(),
            enabled: record.enabled,
            busy: record.busy,
            task_id,
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_flags(self.enabled, self.busy)
    }
}

/// In-flight task row in a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: TaskId,
    pub worker: WorkerName,
    pub target: String,
    pub duration_secs: u64,
    pub started_at_ms: u64,
}

impl From<&TaskRecord> for TaskEntry {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            worker: record.worker.clone(),
            target: record.target.clone(),
            duration_secs: record.duration_secs,
            started_at_ms: record.started_at_ms,
        }
    }
}

/// Read-only view of the dispatcher registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Workers in registration order
    pub workers: Vec<WorkerEntry>,
    /// In-flight tasks, oldest first
    pub tasks: Vec<TaskEntry>,
}

impl StatusSnapshot {
    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn available_count(&self) -> usize {
        self.workers.iter().filter(|w| w.enabled && !w.busy).count()
    }

    pub fn worker(&self, name: &str) -> Option<&WorkerEntry> {
        self.workers.iter().find(|w| w.name == name)
    }
}
