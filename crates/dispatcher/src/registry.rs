// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry and in-flight task table.
//!
//! Busy flags, task records and expiry timers are mutated together through
//! this type so they cannot drift apart: a live [`TaskRecord`] always names a
//! busy worker, and releasing a task clears the flag, drops the record and
//! cancels the timer in one step.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use fleet_core::{TaskId, TaskRecord, TaskSpec, WorkerName, WorkerRecord};
use fleet_wire::{StatusSnapshot, TaskEntry, WorkerEntry};

use crate::error::DispatchError;
use crate::scheduler::Scheduler;

#[derive(Debug, Default)]
pub struct Registry {
    /// Registration order doubles as first-fit order
    workers: Vec<WorkerRecord>,
    tasks: HashMap<TaskId, TaskRecord>,
    timers: Scheduler,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from records, rejecting duplicate names.
    pub fn with_workers(
        workers: impl IntoIterator<Item = WorkerRecord>,
    ) -> Result<Self, DispatchError> {
        let mut registry = Self::new();
        for worker in workers {
            registry.register(worker)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, mut worker: WorkerRecord) -> Result<(), DispatchError> {
        if self.worker(worker.name.as_str()).is_some() {
            return Err(DispatchError::DuplicateWorker(worker.name));
        }
        // Nothing is assigned yet, whatever the caller passed in.
        worker.busy = false;
        self.workers.push(worker);
        Ok(())
    }

    pub fn worker(&self, name: &str) -> Option<&WorkerRecord> {
        self.workers.iter().find(|w| w.name == name)
    }

    pub fn workers(&self) -> &[WorkerRecord] {
        &self.workers
    }

    pub fn first_idle(&self) -> Option<&WorkerRecord> {
        self.workers.iter().find(|w| w.is_idle())
    }

    pub fn idle_workers(&self) -> Vec<WorkerRecord> {
        self.workers.iter().filter(|w| w.is_idle()).cloned().collect()
    }

    pub fn task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    pub fn task_for_worker(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.values().find(|t| t.worker == name)
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Mark `worker` busy and record a new task for it.
    ///
    /// Returns `None` (and changes nothing) unless the worker exists and is
    /// enabled and idle.
    pub fn assign(&mut self, worker: &str, task: &TaskSpec, now_ms: u64) -> Option<TaskRecord> {
        let record = self.workers.iter_mut().find(|w| w.name == worker)?;
        if !record.is_idle() {
            return None;
        }
        record.busy = true;

        let task = TaskRecord {
            id: TaskId::new(),
            worker: record.name.clone(),
            started_at_ms: now_ms,
            target: task.target.clone(),
            duration_secs: task.duration_secs,
        };
        self.tasks.insert(task.id.clone(), task.clone());
        Some(task)
    }

    /// Arm the expiry timer for a live task. Returns false if the task was
    /// already released.
    pub fn arm_expiry(&mut self, id: &TaskId, after: Duration, now: Instant) -> bool {
        if !self.tasks.contains_key(id.as_str()) {
            return false;
        }
        self.timers.set_timer(id.clone(), after, now);
        true
    }

    /// Release a task: free its worker, drop the record, cancel its timer.
    ///
    /// Idempotent. Only the first call for an id returns the record.
    pub fn release(&mut self, id: &str) -> Option<TaskRecord> {
        self.timers.cancel_timer(id);
        let task = self.tasks.remove(id)?;
        if let Some(worker) = self.workers.iter_mut().find(|w| w.name == task.worker) {
            worker.busy = false;
        }
        Some(task)
    }

    /// Release every task whose timer fired at or before `now`.
    pub fn expired(&mut self, now: Instant) -> Vec<TaskRecord> {
        let fired = self.timers.fired_timers(now);
        fired.iter().filter_map(|id| self.release(id.as_str())).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn expiry_deadline(&self, id: &str) -> Option<Instant> {
        self.timers.deadline(id)
    }

    /// Enable or disable a worker.
    ///
    /// Disabling clears `busy` and releases the worker's task, which is
    /// returned so the caller can notify and cancel it remotely.
    pub fn set_enabled(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<Option<TaskRecord>, DispatchError> {
        let worker = self
            .workers
            .iter_mut()
            .find(|w| w.name == name)
            .ok_or_else(|| DispatchError::UnknownWorker(name.to_string()))?;
        worker.set_enabled(enabled);
        if enabled {
            return Ok(None);
        }

        let orphan = self.task_for_worker(name).map(|t| t.id.clone());
        Ok(orphan.and_then(|id| self.release(id.as_str())))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let workers = self
            .workers
            .iter()
            .map(|w| {
                let task_id = self.task_for_worker(w.name.as_str()).map(|t| t.id.clone());
                WorkerEntry::from_record(w, task_id)
            })
            .collect();

        let mut tasks: Vec<TaskEntry> = self.tasks.values().map(TaskEntry::from).collect();
        tasks.sort_by(|a, b| a.started_at_ms.cmp(&b.started_at_ms).then(a.id.cmp(&b.id)));

        StatusSnapshot { workers, tasks }
    }
}

/// Worker names in registration order, for log lines.
pub fn names(workers: &[WorkerRecord]) -> Vec<&WorkerName> {
    workers.iter().map(|w| &w.name).collect()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
