// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker agent: runs at most one payload at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{TaskError, TaskId, TaskSpec};
use fleet_wire::AgentErrorKind;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::executor::{spawn_payload, TaskRun};
use crate::task_log::TaskLogger;

/// Reasons an agent refuses to start a task. No subprocess exists afterwards.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid task: {0}")]
    InvalidTask(#[from] TaskError),

    #[error("worker is busy with {running}")]
    WorkerBusy { running: TaskId },

    #[error("payload not found at {0}")]
    PayloadMissing(PathBuf),

    #[error("failed to start payload: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

impl AgentError {
    pub fn kind(&self) -> AgentErrorKind {
        match self {
            AgentError::InvalidTask(_) => AgentErrorKind::InvalidTask,
            AgentError::WorkerBusy { .. } => AgentErrorKind::WorkerBusy,
            AgentError::PayloadMissing(_) => AgentErrorKind::PayloadMissing,
            AgentError::SpawnFailed(_) => AgentErrorKind::SpawnFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Executable launched for every task
    pub payload: PathBuf,
    pub max_duration_secs: u64,
    /// Time between SIGTERM and SIGKILL on cancel
    pub kill_grace: Duration,
}

struct Running {
    task_id: TaskId,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct Agent {
    settings: Arc<AgentSettings>,
    logger: TaskLogger,
    running: Arc<Mutex<Option<Running>>>,
    idle: Arc<Notify>,
}

impl Agent {
    pub fn new(settings: AgentSettings, logger: TaskLogger) -> Self {
        Self {
            settings: Arc::new(settings),
            logger,
            running: Arc::new(Mutex::new(None)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Id of the task currently running, if any.
    pub fn running(&self) -> Option<TaskId> {
        self.running.lock().as_ref().map(|r| r.task_id.clone())
    }

    /// Validate and launch one task.
    ///
    /// Checks run in order: task shape, busy slot, payload presence. The slot
    /// is freed when the subprocess has been reaped, just before the run
    /// yields `Completed`.
    pub fn execute(&self, task_id: TaskId, task: &TaskSpec) -> Result<TaskRun, AgentError> {
        task.validate_with_limit(self.settings.max_duration_secs)?;

        let mut slot = self.running.lock();
        if let Some(current) = slot.as_ref() {
            return Err(AgentError::WorkerBusy { running: current.task_id.clone() });
        }
        if !self.settings.payload.is_file() {
            return Err(AgentError::PayloadMissing(self.settings.payload.clone()));
        }

        let on_exit = {
            let running = Arc::clone(&self.running);
            let idle = Arc::clone(&self.idle);
            let task_id = task_id.clone();
            move || {
                let mut slot = running.lock();
                if slot.as_ref().is_some_and(|r| r.task_id == task_id) {
                    *slot = None;
                }
                drop(slot);
                idle.notify_waiters();
            }
        };

        let log = self.logger.open(task_id.as_str());
        let run = spawn_payload(
            &self.settings.payload,
            &task_id,
            task,
            self.settings.kill_grace,
            log,
            on_exit,
        )
        .map_err(AgentError::SpawnFailed)?;

        *slot = Some(Running { task_id, cancel: run.canceller() });
        Ok(run)
    }

    /// Stop the named task. Returns false if it is not running here.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        match self.running.lock().as_ref() {
            Some(current) if &current.task_id == task_id => {
                current.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait until no task is running. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.idle.notified();
            if self.running.lock().is_none() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }

    /// Stop whatever is running and wait for it to exit.
    pub async fn shutdown(&self) {
        let running = self.running.lock().as_ref().map(|r| (r.task_id.clone(), r.cancel.clone()));
        let Some((task_id, cancel)) = running else {
            return;
        };
        tracing::info!(%task_id, "stopping running task for shutdown");
        cancel.cancel();
        if !self.wait_idle(self.settings.kill_grace + Duration::from_secs(2)).await {
            tracing::warn!(%task_id, "payload still running at shutdown");
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
