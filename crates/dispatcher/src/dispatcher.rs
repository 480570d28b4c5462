// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task dispatch: worker selection, forwarding, release and expiry.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::{
    Clock, ReleaseReason, TaskEvent, TaskId, TaskRecord, TaskSpec, WorkerName, WorkerRecord,
};
use fleet_wire::StatusSnapshot;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::link::{LinkEvent, WorkerLink};
use crate::notify::Notifier;
use crate::registry::Registry;

/// One day, matching the agent's default limit
pub const DEFAULT_MAX_DURATION_SECS: u64 = 86_400;

/// Tunables for dispatch timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Added to a task's duration before its expiry timer fires
    pub expiry_slack: Duration,
    /// Pause between successive forwards of a broadcast
    pub launch_delay: Duration,
    /// Longest task duration accepted for dispatch
    pub max_duration_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            expiry_slack: Duration::from_secs(10),
            launch_delay: Duration::from_secs(1),
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

/// Result of a single-worker submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub task_id: TaskId,
    pub worker: WorkerName,
}

/// Result of a broadcast submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub count: usize,
    pub task_ids: Vec<TaskId>,
}

/// Owns the registry and drives every task through assign, forward and
/// release.
///
/// Cheap to clone; clones share the same registry.
pub struct Dispatcher<L: WorkerLink, C: Clock> {
    registry: Arc<Mutex<Registry>>,
    link: L,
    clock: C,
    notifier: Notifier,
    settings: DispatchSettings,
}

impl<L: WorkerLink, C: Clock> Clone for Dispatcher<L, C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            link: self.link.clone(),
            clock: self.clock.clone(),
            notifier: self.notifier.clone(),
            settings: self.settings,
        }
    }
}

impl<L: WorkerLink, C: Clock> Dispatcher<L, C> {
    pub fn new(
        registry: Registry,
        link: L,
        clock: C,
        notifier: Notifier,
        settings: DispatchSettings,
    ) -> Self {
        Self { registry: Arc::new(Mutex::new(registry)), link, clock, notifier, settings }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn status(&self) -> StatusSnapshot {
        self.registry.lock().snapshot()
    }

    /// Run `task` on the first enabled, idle worker in registration order.
    pub async fn submit_single(&self, task: TaskSpec) -> Result<Submitted, DispatchError> {
        task.validate_with_limit(self.settings.max_duration_secs)?;

        let (worker, record) = {
            let mut registry = self.registry.lock();
            let worker = registry.first_idle().cloned().ok_or(DispatchError::NoWorkerAvailable)?;
            let record = registry
                .assign(worker.name.as_str(), &task, self.clock.epoch_ms())
                .ok_or(DispatchError::NoWorkerAvailable)?;
            (worker, record)
        };

        self.dispatch(&worker, &record, &task).await?;
        Ok(Submitted { task_id: record.id, worker: worker.name })
    }

    /// Run `task` on every worker that is enabled and idle right now.
    ///
    /// Forwards happen one at a time with `launch_delay` between them. A
    /// failed forward frees that worker and the batch carries on.
    pub async fn submit_all(&self, task: TaskSpec) -> Result<Launched, DispatchError> {
        task.validate_with_limit(self.settings.max_duration_secs)?;

        let candidates = self.registry.lock().idle_workers();
        if candidates.is_empty() {
            return Err(DispatchError::NoWorkerAvailable);
        }
        tracing::info!(
            workers = candidates.len(),
            target = %task.target,
            "broadcasting task"
        );

        let mut task_ids = Vec::with_capacity(candidates.len());
        for (i, worker) in candidates.iter().enumerate() {
            if i > 0 && !self.settings.launch_delay.is_zero() {
                tokio::time::sleep(self.settings.launch_delay).await;
            }

            let assigned =
                self.registry.lock().assign(worker.name.as_str(), &task, self.clock.epoch_ms());
            let Some(record) = assigned else {
                // Taken or disabled since the snapshot
                tracing::debug!(worker = %worker.name, "worker no longer idle, skipping");
                continue;
            };

            match self.dispatch(worker, &record, &task).await {
                Ok(()) => task_ids.push(record.id),
                Err(e) => {
                    tracing::warn!(worker = %worker.name, error = %e, "broadcast forward failed")
                }
            }
        }

        Ok(Launched { count: task_ids.len(), task_ids })
    }

    /// Forward an assigned task and arm its expiry, or undo the assignment.
    async fn dispatch(
        &self,
        worker: &WorkerRecord,
        record: &TaskRecord,
        task: &TaskSpec,
    ) -> Result<(), DispatchError> {
        self.notifier.publish(TaskEvent::Assigned {
            id: record.id.clone(),
            worker: worker.name.clone(),
            target: task.target.clone(),
        });

        if let Err(source) = self.link.forward(worker, &record.id, task).await {
            self.notifier.publish(TaskEvent::ForwardFailed {
                id: record.id.clone(),
                worker: worker.name.clone(),
                error: source.to_string(),
            });
            self.release(&record.id, ReleaseReason::ForwardFailed);
            return Err(DispatchError::ForwardFailure { worker: worker.name.clone(), source });
        }

        let ttl =
            Duration::from_secs(task.duration_secs).saturating_add(self.settings.expiry_slack);
        if !self.registry.lock().arm_expiry(&record.id, ttl, self.clock.now()) {
            // Completed before the forward returned
            tracing::debug!(task_id = %record.id, "task released before expiry was armed");
        }
        Ok(())
    }

    /// Free a task's worker. Returns false if the task was already released.
    pub fn release(&self, task_id: &TaskId, reason: ReleaseReason) -> bool {
        let released = self.registry.lock().release(task_id.as_str());
        match released {
            Some(task) => {
                let event = TaskEvent::Released { id: task.id, worker: task.worker, reason };
                self.notifier.publish(event);
                true
            }
            None => false,
        }
    }

    /// Enable or disable a worker.
    ///
    /// Disabling a busy worker releases its task and asks the worker to stop
    /// it. The remote cancel is best effort.
    pub async fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<Option<TaskRecord>, DispatchError> {
        let (released, worker) = {
            let mut registry = self.registry.lock();
            let released = registry.set_enabled(name, enabled)?;
            (released, registry.worker(name).cloned())
        };
        tracing::info!(worker = name, enabled, "worker availability changed");

        if let (Some(task), Some(worker)) = (&released, worker) {
            self.notifier.publish(TaskEvent::Released {
                id: task.id.clone(),
                worker: task.worker.clone(),
                reason: ReleaseReason::Disabled,
            });
            self.cancel_remote(&worker, &task.id).await;
        }
        Ok(released)
    }

    /// Free a task's worker and ask the worker to stop it.
    ///
    /// The release happens first, so a completion racing the remote cancel is
    /// dropped as stale.
    pub async fn cancel(&self, task_id: &str) -> Result<(), DispatchError> {
        let (task, worker) = {
            let registry = self.registry.lock();
            let task = registry
                .task(task_id)
                .cloned()
                .ok_or_else(|| DispatchError::UnknownTask(task_id.to_string()))?;
            let worker = registry.worker(task.worker.as_str()).cloned();
            (task, worker)
        };

        if !self.release(&task.id, ReleaseReason::Cancelled) {
            // Released by something else in the meantime
            return Ok(());
        }
        if let Some(worker) = worker {
            self.cancel_remote(&worker, &task.id).await;
        }
        Ok(())
    }

    async fn cancel_remote(&self, worker: &WorkerRecord, task_id: &TaskId) {
        match self.link.cancel(worker, task_id).await {
            Ok(found) => tracing::debug!(%task_id, worker = %worker.name, found, "remote cancel"),
            Err(e) => {
                tracing::warn!(%task_id, worker = %worker.name, error = %e, "remote cancel failed")
            }
        }
    }

    /// Release every task whose expiry deadline has passed.
    pub fn fire_expired(&self) -> Vec<TaskId> {
        let expired = self.registry.lock().expired(self.clock.now());
        expired
            .into_iter()
            .map(|task| {
                tracing::warn!(
                    task_id = %task.id,
                    worker = %task.worker,
                    duration_secs = task.duration_secs,
                    "task expired without completion"
                );
                self.notifier.publish(TaskEvent::Released {
                    id: task.id.clone(),
                    worker: task.worker,
                    reason: ReleaseReason::Expired,
                });
                task.id
            })
            .collect()
    }

    /// Apply one event reported by a worker.
    ///
    /// Events for tasks that are no longer tracked (expired, cancelled) are
    /// dropped.
    pub fn handle_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Progress { task_id, worker, message } => {
                if !self.is_live(&task_id) {
                    tracing::debug!(%task_id, %worker, "progress for released task");
                    return;
                }
                self.notifier.publish(TaskEvent::Progress { id: task_id, worker, message });
            }
            LinkEvent::Completed { task_id, worker, exit_code } => {
                if !self.is_live(&task_id) {
                    tracing::debug!(%task_id, %worker, ?exit_code, "completion for released task");
                    return;
                }
                self.notifier.publish(TaskEvent::Completed {
                    id: task_id.clone(),
                    worker,
                    exit_code,
                });
                self.release(&task_id, ReleaseReason::Completed);
            }
            LinkEvent::Disconnected { task_id, worker, error } => {
                // Expiry still bounds how long the worker stays busy
                tracing::warn!(%task_id, %worker, %error, "lost connection to worker mid-task");
            }
        }
    }

    fn is_live(&self, task_id: &TaskId) -> bool {
        self.registry.lock().task(task_id.as_str()).is_some()
    }

    /// Fire expiry timers until `shutdown` is cancelled.
    ///
    /// Sleeps until the next deadline, but never longer than `check`, so a
    /// timer armed while sleeping is noticed within one interval.
    pub async fn run_expiry_loop(&self, check: Duration, shutdown: CancellationToken) {
        loop {
            let next = self.registry.lock().next_deadline();
            let wait = match next {
                Some(deadline) => deadline.saturating_duration_since(self.clock.now()).min(check),
                None => check,
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            self.fire_expired();
        }
    }

    /// Apply worker events until the channel closes or `shutdown` fires.
    pub async fn run_link_events(
        &self,
        mut events: mpsc::Receiver<LinkEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_link_event(event),
                    None => break,
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
