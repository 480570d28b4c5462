// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher error taxonomy.

use fleet_core::{TaskError, WorkerName};
use fleet_wire::ErrorKind;
use thiserror::Error;

use crate::link::LinkError;

/// Errors returned by dispatcher operations.
///
/// Each error ends the single request it occurred in; nothing is retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no workers available")]
    NoWorkerAvailable,

    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("duplicate worker: {0}")]
    DuplicateWorker(WorkerName),

    #[error("invalid task: {0}")]
    Validation(#[from] TaskError),

    #[error("failed to forward task to {worker}: {source}")]
    ForwardFailure {
        worker: WorkerName,
        #[source]
        source: LinkError,
    },
}

impl DispatchError {
    /// Operator-facing category for the wire protocol.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::NoWorkerAvailable => ErrorKind::Capacity,
            DispatchError::UnknownWorker(_) => ErrorKind::UnknownWorker,
            DispatchError::UnknownTask(_) => ErrorKind::UnknownTask,
            DispatchError::DuplicateWorker(_) | DispatchError::Validation(_) => {
                ErrorKind::Validation
            }
            DispatchError::ForwardFailure { .. } => ErrorKind::Transport,
        }
    }
}
