// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task descriptors and in-flight task records.

use crate::worker::WorkerName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for one dispatched task.
    ///
    /// Broadcast submissions mint one id per selected worker.
    pub struct TaskId("tsk-");
}

/// Longest accepted target descriptor, in bytes.
pub const MAX_TARGET_LEN: usize = 2048;

/// Errors from task validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("target must not be empty")]
    EmptyTarget,
    #[error("target is longer than {MAX_TARGET_LEN} bytes")]
    TargetTooLong,
    #[error("target contains control characters")]
    ControlCharacters,
    #[error("duration must be at least 1 second")]
    ZeroDuration,
    #[error("duration {secs}s exceeds the limit of {max}s")]
    DurationTooLong { secs: u64, max: u64 },
    #[error("argument {index} contains a NUL byte")]
    NulInArgument { index: usize },
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
}

/// What an operator asks a worker to run.
///
/// The payload program receives `target`, `duration_secs` and then `args`
/// as positional arguments. None of them are interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub target: String,
    pub duration_secs: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl TaskSpec {
    pub fn new(target: impl Into<String>, duration_secs: u64) -> Self {
        Self { target: target.into(), duration_secs, args: Vec::new() }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Check the shape of the task without any deployment-specific limits.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.target.trim().is_empty() {
            return Err(TaskError::EmptyTarget);
        }
        if self.target.len() > MAX_TARGET_LEN {
            return Err(TaskError::TargetTooLong);
        }
        if self.target.chars().any(char::is_control) {
            return Err(TaskError::ControlCharacters);
        }
        if self.duration_secs == 0 {
            return Err(TaskError::ZeroDuration);
        }
        if let Some(index) = self.args.iter().position(|a| a.contains('\0')) {
            return Err(TaskError::NulInArgument { index });
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus an upper bound on the duration.
    pub fn validate_with_limit(&self, max_duration_secs: u64) -> Result<(), TaskError> {
        self.validate()?;
        if self.duration_secs > max_duration_secs {
            return Err(TaskError::DurationTooLong {
                secs: self.duration_secs,
                max: max_duration_secs,
            });
        }
        Ok(())
    }
}

/// Parse a duration like `30`, `30s`, `5m` or `2h` into whole seconds.
pub fn parse_duration_secs(s: &str) -> Result<u64, TaskError> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let value: u64 = num.parse().map_err(|_| TaskError::InvalidDuration(s.to_string()))?;
    let multiplier = match unit {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3600,
        _ => return Err(TaskError::InvalidDuration(s.to_string())),
    };
    value.checked_mul(multiplier).ok_or_else(|| TaskError::InvalidDuration(s.to_string()))
}

/// A task currently assigned to a worker.
///
/// The named worker is busy for as long as this record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub worker: WorkerName,
    pub started_at_ms: u64,
    pub target: String,
    pub duration_secs: u64,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
