// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator socket listener.
//!
//! Accepts connections on the Unix socket (and optionally TCP), checks the
//! administrator token and serves one request per connection. `Watch` keeps
//! the connection open and streams task events until the client goes away.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::Clock;
use fleet_wire::{
    read_frame, token_matches, write_frame, ProtocolError, Request, Response, PROTOCOL_VERSION,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::link::WorkerLink;

/// Shared context for all connection handlers.
pub struct ListenCtx<L: WorkerLink, C: Clock> {
    pub dispatcher: Dispatcher<L, C>,
    pub admin_token: String,
    pub ipc_timeout: Duration,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Listener task for accepting operator connections.
pub struct Listener<L: WorkerLink, C: Clock> {
    unix: UnixListener,
    tcp: Option<TcpListener>,
    ctx: Arc<ListenCtx<L, C>>,
}

impl<L: WorkerLink, C: Clock> Listener<L, C> {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<L, C>>) -> Self {
        Self { unix, tcp: None, ctx }
    }

    pub fn with_tcp(unix: UnixListener, tcp: TcpListener, ctx: Arc<ListenCtx<L, C>>) -> Self {
        Self { unix, tcp: Some(tcp), ctx }
    }

    /// Accept connections until `shutdown` fires, one task per connection.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let (reader, writer) = stream.into_split();
                        self.spawn_connection(reader, writer);
                    }
                    Err(e) => error!("unix accept error: {}", e),
                },
                result = accept_tcp(self.tcp.as_ref()) => match result {
                    Ok((stream, addr)) => {
                        debug!("tcp connection from {}", addr);
                        let (reader, writer) = stream.into_split();
                        self.spawn_connection(reader, writer);
                    }
                    Err(e) => error!("tcp accept error: {}", e),
                },
            }
        }
    }

    fn spawn_connection<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                log_connection_error(e);
            }
        });
    }
}

/// Accept on the TCP listener if there is one; otherwise never resolve.
async fn accept_tcp(
    tcp: Option<&TcpListener>,
) -> std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)> {
    match tcp {
        Some(tcp) => tcp.accept().await,
        None => std::future::pending().await,
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => debug!("client disconnected"),
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("connection timeout"),
        _ => error!("connection error: {}", e),
    }
}

/// Serve a single operator connection.
///
/// The first frame must be a `Hello` carrying the admin token. Anything else
/// closes the connection without a reply.
pub async fn handle_connection<R, W, L, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<L, C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    L: WorkerLink,
    C: Clock,
{
    let hello: Request = read_frame(&mut reader, ctx.ipc_timeout).await?;
    match hello {
        Request::Hello { token, .. } if token_matches(&token, &ctx.admin_token) => {}
        other => {
            warn!(request = other.name(), "dropping unauthenticated connection");
            return Ok(());
        }
    }
    let reply = Response::Hello { version: PROTOCOL_VERSION.to_string() };
    write_frame(&mut writer, &reply, ctx.ipc_timeout).await?;

    let request: Request = read_frame(&mut reader, ctx.ipc_timeout).await?;
    if matches!(request, Request::Status | Request::Ping) {
        debug!(request = request.name(), "received request");
    } else {
        info!(request = request.name(), "received request");
    }

    if let Request::Watch = request {
        return stream_events(reader, writer, ctx).await;
    }

    // Run to completion even if the client hangs up, so a half-finished
    // submit never leaves a worker assigned without an expiry timer.
    let response = handle_request(request, ctx).await;
    debug!("sending response: {:?}", response);
    write_frame(&mut writer, &response, ctx.ipc_timeout).await?;
    Ok(())
}

async fn handle_request<L: WorkerLink, C: Clock>(
    request: Request,
    ctx: &ListenCtx<L, C>,
) -> Response {
    let dispatcher = &ctx.dispatcher;
    let result = match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { .. } => Ok(Response::Hello { version: PROTOCOL_VERSION.to_string() }),

        Request::Submit { task } => dispatcher
            .submit_single(task)
            .await
            .map(|s| Response::Submitted { task_id: s.task_id, worker: s.worker }),

        Request::SubmitAll { task } => dispatcher
            .submit_all(task)
            .await
            .map(|l| Response::Launched { count: l.count, task_ids: l.task_ids }),

        Request::Status => Ok(Response::Status { status: dispatcher.status() }),

        Request::Enable { worker } => {
            dispatcher.set_enabled(worker.as_str(), true).await.map(|_| Response::Ok)
        }

        Request::Disable { worker } => {
            dispatcher.set_enabled(worker.as_str(), false).await.map(|_| Response::Ok)
        }

        Request::Cancel { task_id } => {
            dispatcher.cancel(task_id.as_str()).await.map(|()| Response::Ok)
        }

        // Intercepted in handle_connection
        Request::Watch => Ok(Response::Ok),
    };
    result.unwrap_or_else(error_response)
}

fn error_response(e: DispatchError) -> Response {
    warn!(kind = %e.kind(), "request failed: {}", e);
    Response::error(e.kind(), e.to_string())
}

/// Relay task events to a watching client until it disconnects.
async fn stream_events<R, W, L, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<L, C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    L: WorkerLink,
    C: Clock,
{
    let mut events = ctx.dispatcher.notifier().subscribe();
    write_frame(&mut writer, &Response::Ok, ctx.ipc_timeout).await?;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    write_frame(&mut writer, &Response::Event { event }, ctx.ipc_timeout).await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watcher fell behind, events dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = detect_client_disconnect(&mut reader) => {
                debug!("watcher disconnected");
                return Ok(());
            }
        }
    }
}

/// Resolves when the client closes its end (or sends anything at all).
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
