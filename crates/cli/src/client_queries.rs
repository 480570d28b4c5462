// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed request methods for DaemonClient.

use fleet_core::{TaskEvent, TaskId, TaskSpec, WorkerName};
use fleet_wire::{decode, read_frame, read_message, write_frame, ProtocolError};
use fleet_wire::{Request, Response, StatusSnapshot};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::client::{ClientError, DaemonClient};

/// A live `Watch` subscription.
pub struct EventStream {
    reader: OwnedReadHalf,
    // Dropping the write half would signal disconnect to the dispatcher
    _writer: OwnedWriteHalf,
}

impl EventStream {
    /// Next event, or `None` once the dispatcher goes away.
    pub async fn next(&mut self) -> Option<Result<TaskEvent, ClientError>> {
        let bytes = match read_message(&mut self.reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => return None,
            Err(e) => return Some(Err(e.into())),
        };
        match decode::<Response>(&bytes) {
            Ok(Response::Event { event }) => Some(Ok(event)),
            Ok(other) => Some(DaemonClient::reject(other)),
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl DaemonClient {
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    /// Run a task on the first available worker.
    pub async fn submit(&self, task: TaskSpec) -> Result<(TaskId, WorkerName), ClientError> {
        match self.send(&Request::Submit { task }).await? {
            Response::Submitted { task_id, worker } => Ok((task_id, worker)),
            other => Self::reject(other),
        }
    }

    /// Run a task on every available worker.
    pub async fn submit_all(&self, task: TaskSpec) -> Result<Vec<TaskId>, ClientError> {
        match self.send(&Request::SubmitAll { task }).await? {
            Response::Launched { task_ids, .. } => Ok(task_ids),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self) -> Result<StatusSnapshot, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { status } => Ok(status),
            other => Self::reject(other),
        }
    }

    pub async fn set_enabled(&self, worker: &str, enabled: bool) -> Result<(), ClientError> {
        let worker = WorkerName::new(worker);
        let request =
            if enabled { Request::Enable { worker } } else { Request::Disable { worker } };
        match self.send(&request).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn cancel(&self, task_id: &str) -> Result<(), ClientError> {
        let request = Request::Cancel { task_id: TaskId::from_string(task_id) };
        match self.send(&request).await? {
            Response::Ok => Ok(()),
            other => Self::reject(other),
        }
    }

    /// Subscribe to task events.
    pub async fn watch(&self) -> Result<EventStream, ClientError> {
        let (mut reader, mut writer) = self.open().await?;
        write_frame(&mut writer, &Request::Watch, crate::client::QUERY_TIMEOUT).await?;
        match read_frame(&mut reader, crate::client::QUERY_TIMEOUT).await? {
            Response::Ok => Ok(EventStream { reader, _writer: writer }),
            other => Self::reject(other),
        }
    }
}
