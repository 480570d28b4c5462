// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-channel server: receives tasks from the dispatcher and streams
//! their events back on the same connection.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::ProgressEvent;
use fleet_wire::{
    read_frame, token_matches, write_frame, AgentRequest, AgentResponse, ProtocolError,
    PROTOCOL_VERSION,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;

pub struct ServerCtx {
    pub agent: Agent,
    pub token: String,
    pub ipc_timeout: Duration,
}

pub struct AgentServer {
    listener: TcpListener,
    ctx: Arc<ServerCtx>,
}

impl AgentServer {
    pub fn new(listener: TcpListener, ctx: ServerCtx) -> Self {
        Self { listener, ctx: Arc::new(ctx) }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept dispatcher connections until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.listener.accept() => match result {
                    Ok((stream, addr)) => {
                        debug!("control connection from {}", addr);
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                match e {
                                    ProtocolError::ConnectionClosed => {
                                        debug!("dispatcher disconnected")
                                    }
                                    e => warn!("control connection error: {}", e),
                                }
                            }
                        });
                    }
                    Err(e) => error!("accept error: {}", e),
                },
            }
        }
    }
}

/// Serve one control connection: `Hello`, then one `Execute` or `Cancel`.
///
/// A wrong token closes the connection without a reply.
pub async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ServerCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let hello: AgentRequest = read_frame(&mut reader, ctx.ipc_timeout).await?;
    match hello {
        AgentRequest::Hello { token, .. } if token_matches(&token, &ctx.token) => {}
        _ => {
            warn!("dropping unauthenticated control connection");
            return Ok(());
        }
    }
    let reply = AgentResponse::Hello { version: PROTOCOL_VERSION.to_string() };
    write_frame(&mut writer, &reply, ctx.ipc_timeout).await?;

    let request: AgentRequest = read_frame(&mut reader, ctx.ipc_timeout).await?;
    match request {
        AgentRequest::Execute { task_id, task } => {
            info!(%task_id, target = %task.target, duration_secs = task.duration_secs, "execute");
            let mut run = match ctx.agent.execute(task_id.clone(), &task) {
                Ok(run) => run,
                Err(e) => {
                    warn!(%task_id, kind = %e.kind(), "rejected task: {}", e);
                    let reply = AgentResponse::Rejected { kind: e.kind(), message: e.to_string() };
                    return write_frame(&mut writer, &reply, ctx.ipc_timeout).await;
                }
            };
            let accepted = AgentResponse::Accepted { task_id: task_id.clone() };
            write_frame(&mut writer, &accepted, ctx.ipc_timeout).await?;

            while let Some(event) = run.next_event().await {
                let frame = match event {
                    ProgressEvent::Progress { message } => {
                        AgentResponse::Progress { task_id: task_id.clone(), message }
                    }
                    ProgressEvent::Completed { exit_code } => {
                        AgentResponse::Completed { task_id: task_id.clone(), exit_code }
                    }
                };
                if let Err(e) = write_frame(&mut writer, &frame, ctx.ipc_timeout).await {
                    // The payload keeps running; its output still reaches the task log
                    warn!(%task_id, error = %e, "lost dispatcher connection, no longer relaying");
                    return Ok(());
                }
            }
            Ok(())
        }
        AgentRequest::Cancel { task_id } => {
            let found = ctx.agent.cancel(&task_id);
            info!(%task_id, found, "cancel");
            write_frame(&mut writer, &AgentResponse::Cancelled { task_id, found }, ctx.ipc_timeout)
                .await
        }
        AgentRequest::Hello { .. } => {
            debug!("repeated hello, closing");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
