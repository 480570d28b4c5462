// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-socket client.
//!
//! Every call opens a fresh connection, authenticates with `Hello` and sends
//! one request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_wire::{
    read_frame, write_frame, ErrorKind, ProtocolError, Request, Response, PROTOCOL_VERSION,
};
use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::exit_error::{ExitError, EXIT_UNREACHABLE};

/// Handshake and read-only requests.
pub(crate) const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Submissions wait on worker forwards and broadcast pacing.
const ACTION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to dispatcher at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dispatcher closed the connection during handshake (check FLEET_ADMIN_TOKEN)")]
    Unauthorized,

    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("unexpected response from dispatcher: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Rejected { kind, .. } => ExitError::code_for(*kind),
            ClientError::Connect { .. } | ClientError::Unauthorized => EXIT_UNREACHABLE,
            ClientError::Unexpected(_) | ClientError::Protocol(_) => 1,
        }
    }
}

impl From<ClientError> for ExitError {
    fn from(e: ClientError) -> Self {
        ExitError::new(e.exit_code(), e.to_string())
    }
}

pub struct DaemonClient {
    socket: PathBuf,
    token: String,
}

impl DaemonClient {
    pub fn new(socket: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self { socket: socket.into(), token: token.into() }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Connect and complete the `Hello` exchange.
    pub(crate) async fn open(&self) -> Result<(OwnedReadHalf, OwnedWriteHalf), ClientError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| ClientError::Connect { path: self.socket.clone(), source })?;
        let (mut reader, mut writer) = stream.into_split();

        let hello = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
            token: self.token.clone(),
        };
        write_frame(&mut writer, &hello, QUERY_TIMEOUT).await?;
        match read_frame::<Response, _>(&mut reader, QUERY_TIMEOUT).await {
            Ok(Response::Hello { .. }) => Ok((reader, writer)),
            Ok(other) => Self::reject(other),
            Err(ProtocolError::ConnectionClosed) => Err(ClientError::Unauthorized),
            Err(e) => Err(e.into()),
        }
    }

    /// Send one request and read its single response.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let (mut reader, mut writer) = self.open().await?;
        write_frame(&mut writer, request, QUERY_TIMEOUT).await?;
        let response = read_frame(&mut reader, response_timeout(request)).await?;
        match response {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            response => Ok(response),
        }
    }

    /// Map an unexpected response to an error.
    pub fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            other => Err(ClientError::Unexpected(format!("{other:?}"))),
        }
    }
}

fn response_timeout(request: &Request) -> Duration {
    match request {
        Request::Submit { .. }
        | Request::SubmitAll { .. }
        | Request::Disable { .. }
        | Request::Cancel { .. } => ACTION_TIMEOUT,
        _ => QUERY_TIMEOUT,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
