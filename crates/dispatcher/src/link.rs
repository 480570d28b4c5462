// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-control channel: how the dispatcher reaches worker agents.
//!
//! This channel is separate from the operator socket. Each forward opens a
//! TCP connection to the worker's endpoint, authenticates with the worker's
//! token, and stays open while the agent streams progress back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_core::{TaskId, TaskSpec, WorkerName, WorkerRecord};
use fleet_wire::{
    decode, read_frame, read_message, write_frame, AgentErrorKind, AgentRequest, AgentResponse,
    ProtocolError, PROTOCOL_VERSION,
};
use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Errors from the worker-control channel.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no credential configured for worker {0}")]
    NoCredential(WorkerName),

    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker closed the connection during handshake (wrong token?)")]
    HandshakeRefused,

    #[error("worker rejected task ({kind}): {message}")]
    Rejected { kind: AgentErrorKind, message: String },

    #[error("unexpected reply from worker: {0}")]
    Unexpected(String),

    #[error("timed out talking to worker")]
    Timeout,

    #[error(transparent)]
    Protocol(ProtocolError),
}

impl From<ProtocolError> for LinkError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Timeout => LinkError::Timeout,
            other => LinkError::Protocol(other),
        }
    }
}

/// Events streamed back from workers after a forward succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Progress { task_id: TaskId, worker: WorkerName, message: String },
    Completed { task_id: TaskId, worker: WorkerName, exit_code: Option<i32> },
    /// The stream ended without a completion
    Disconnected { task_id: TaskId, worker: WorkerName, error: String },
}

/// Transport used to hand tasks to workers.
#[async_trait]
pub trait WorkerLink: Clone + Send + Sync + 'static {
    /// Deliver a task. `Ok` means the worker accepted it and started running.
    async fn forward(
        &self,
        worker: &WorkerRecord,
        task_id: &TaskId,
        task: &TaskSpec,
    ) -> Result<(), LinkError>;

    /// Ask a worker to stop a task. Returns whether it was running there.
    async fn cancel(&self, worker: &WorkerRecord, task_id: &TaskId) -> Result<bool, LinkError>;
}

/// [`WorkerLink`] over TCP using the worker-control protocol.
#[derive(Clone)]
pub struct TcpWorkerLink {
    credentials: Arc<HashMap<WorkerName, String>>,
    events: mpsc::Sender<LinkEvent>,
    timeout: Duration,
}

impl TcpWorkerLink {
    pub fn new(
        credentials: HashMap<WorkerName, String>,
        events: mpsc::Sender<LinkEvent>,
        timeout: Duration,
    ) -> Self {
        Self { credentials: Arc::new(credentials), events, timeout }
    }

    async fn open(
        &self,
        worker: &WorkerRecord,
    ) -> Result<(OwnedReadHalf, OwnedWriteHalf), LinkError> {
        let token = self
            .credentials
            .get(worker.name.as_str())
            .ok_or_else(|| LinkError::NoCredential(worker.name.clone()))?;

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&worker.endpoint))
            .await
            .map_err(|_| LinkError::Timeout)?
            .map_err(|source| LinkError::Connect { endpoint: worker.endpoint.clone(), source })?;
        let (mut reader, mut writer) = stream.into_split();

        let hello =
            AgentRequest::Hello { version: PROTOCOL_VERSION.to_string(), token: token.clone() };
        write_frame(&mut writer, &hello, self.timeout).await?;
        match read_frame(&mut reader, self.timeout).await {
            Ok(AgentResponse::Hello { version }) => {
                if version != PROTOCOL_VERSION {
                    tracing::warn!(
                        worker = %worker.name,
                        %version,
                        expected = PROTOCOL_VERSION,
                        "worker protocol version mismatch"
                    );
                }
                Ok((reader, writer))
            }
            Ok(other) => Err(LinkError::Unexpected(format!("{other:?}"))),
            Err(ProtocolError::ConnectionClosed) => Err(LinkError::HandshakeRefused),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl WorkerLink for TcpWorkerLink {
    async fn forward(
        &self,
        worker: &WorkerRecord,
        task_id: &TaskId,
        task: &TaskSpec,
    ) -> Result<(), LinkError> {
        let (mut reader, mut writer) = self.open(worker).await?;

        let request = AgentRequest::Execute { task_id: task_id.clone(), task: task.clone() };
        write_frame(&mut writer, &request, self.timeout).await?;

        match read_frame(&mut reader, self.timeout).await? {
            AgentResponse::Accepted { .. } => {}
            AgentResponse::Rejected { kind, message } => {
                return Err(LinkError::Rejected { kind, message })
            }
            other => return Err(LinkError::Unexpected(format!("{other:?}"))),
        }

        tokio::spawn(relay_events(
            reader,
            writer,
            task_id.clone(),
            worker.name.clone(),
            self.events.clone(),
        ));
        Ok(())
    }

    async fn cancel(&self, worker: &WorkerRecord, task_id: &TaskId) -> Result<bool, LinkError> {
        let (mut reader, mut writer) = self.open(worker).await?;
        write_frame(&mut writer, &AgentRequest::Cancel { task_id: task_id.clone() }, self.timeout)
            .await?;
        match read_frame(&mut reader, self.timeout).await? {
            AgentResponse::Cancelled { found, .. } => Ok(found),
            other => Err(LinkError::Unexpected(format!("{other:?}"))),
        }
    }
}

/// Pump agent frames into the dispatcher until the task completes or the
/// connection drops. The write half is held so the agent does not see EOF.
async fn relay_events(
    mut reader: OwnedReadHalf,
    _writer: OwnedWriteHalf,
    task_id: TaskId,
    worker: WorkerName,
    events: mpsc::Sender<LinkEvent>,
) {
    let event = loop {
        let frame =
            read_message(&mut reader).await.and_then(|bytes| decode::<AgentResponse>(&bytes));
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                break LinkEvent::Disconnected {
                    task_id: task_id.clone(),
                    worker: worker.clone(),
                    error: e.to_string(),
                }
            }
        };

        let event = match frame {
            AgentResponse::Progress { message, .. } => {
                LinkEvent::Progress { task_id: task_id.clone(), worker: worker.clone(), message }
            }
            AgentResponse::Completed { exit_code, .. } => {
                break LinkEvent::Completed {
                    task_id: task_id.clone(),
                    worker: worker.clone(),
                    exit_code,
                }
            }
            other => {
                tracing::warn!(%task_id, %worker, frame = ?other, "ignoring unexpected frame");
                continue;
            }
        };
        if events.send(event).await.is_err() {
            return;
        }
    };

    if let Err(e) = events.send(event).await {
        tracing::error!(%task_id, %worker, "failed to deliver final link event: {}", e);
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{LinkError, WorkerLink};
    use async_trait::async_trait;
    use fleet_core::{TaskId, TaskSpec, WorkerName, WorkerRecord};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Recorded forward
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ForwardCall {
        pub worker: WorkerName,
        pub task_id: TaskId,
        pub task: TaskSpec,
    }

    #[derive(Default)]
    struct FakeLinkState {
        forwards: Vec<ForwardCall>,
        cancels: Vec<(WorkerName, TaskId)>,
        failing: HashSet<WorkerName>,
    }

    /// In-memory [`WorkerLink`] for tests.
    #[derive(Clone, Default)]
    pub struct FakeWorkerLink {
        inner: Arc<Mutex<FakeLinkState>>,
    }

    impl FakeWorkerLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every forward to `worker` fail with a connect error.
        pub fn fail_for(&self, worker: &str) {
            self.inner.lock().failing.insert(WorkerName::new(worker));
        }

        pub fn forwards(&self) -> Vec<ForwardCall> {
            self.inner.lock().forwards.clone()
        }

        pub fn cancels(&self) -> Vec<(WorkerName, TaskId)> {
            self.inner.lock().cancels.clone()
        }
    }

    #[async_trait]
    impl WorkerLink for FakeWorkerLink {
        async fn forward(
            &self,
            worker: &WorkerRecord,
            task_id: &TaskId,
            task: &TaskSpec,
        ) -> Result<(), LinkError> {
            let mut inner = self.inner.lock();
            inner.forwards.push(ForwardCall {
                worker: worker.name.clone(),
                task_id: task_id.clone(),
                task: task.clone(),
            });
            if inner.failing.contains(worker.name.as_str()) {
                return Err(LinkError::Connect {
                    endpoint: worker.endpoint.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                });
            }
            Ok(())
        }

        async fn cancel(
            &self,
            worker: &WorkerRecord,
            task_id: &TaskId,
        ) -> Result<bool, LinkError> {
            self.inner.lock().cancels.push((worker.name.clone(), task_id.clone()));
            Ok(true)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerLink, ForwardCall};

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
