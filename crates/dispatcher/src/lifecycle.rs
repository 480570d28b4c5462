// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, run, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use fleet_core::SystemClock;
use thiserror::Error;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{self, Config, ConfigError};
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::link::{LinkEvent, TcpWorkerLink};
use crate::listener::{ListenCtx, Listener};
use crate::notify::Notifier;
use crate::registry::{self, Registry};

/// Dispatcher with the production transport and clock
pub type DaemonDispatcher = Dispatcher<TcpWorkerLink, SystemClock>;

/// Worker events buffered between the link relays and the dispatcher
const LINK_EVENT_BUFFER: usize = 256;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid worker registry: {0}")]
    Registry(#[from] DispatchError),

    #[error("failed to bind {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("failed to bind tcp port {0}: {1}")]
    TcpBindFailed(u16, std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, ready to run.
pub struct Daemon {
    pub config: Config,
    pub dispatcher: DaemonDispatcher,
    listener: Listener<TcpWorkerLink, SystemClock>,
    link_events: mpsc::Receiver<LinkEvent>,
}

/// Load workers, build the dispatcher and bind the operator sockets.
pub async fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let workers = config::load_workers(&config.workers_path)?;
    let registry = Registry::with_workers(workers.iter().map(|w| w.record()))?;
    info!(
        workers = ?registry::names(registry.workers()),
        path = %config.workers_path.display(),
        "loaded worker registry"
    );

    let (events_tx, link_events) = mpsc::channel(LINK_EVENT_BUFFER);
    let link =
        TcpWorkerLink::new(config::credentials(&workers), events_tx, config.forward_timeout);
    let dispatcher =
        Dispatcher::new(registry, link, SystemClock, Notifier::new(), config.settings);

    // Bind last, once everything else has been validated
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let unix = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let ctx = Arc::new(ListenCtx {
        dispatcher: dispatcher.clone(),
        admin_token: config.admin_token.clone(),
        ipc_timeout: config.ipc_timeout,
    });
    let listener = match config.tcp_port {
        Some(port) => {
            let tcp = TcpListener::bind(("0.0.0.0", port))
                .await
                .map_err(|e| LifecycleError::TcpBindFailed(port, e))?;
            info!(port, "listening for operators on tcp");
            Listener::with_tcp(unix, tcp, ctx)
        }
        None => Listener::new(unix, ctx),
    };

    info!(socket = %config.socket_path.display(), "dispatcher ready");
    Ok(Daemon { config, dispatcher, listener, link_events })
}

impl Daemon {
    /// Serve until `shutdown` is cancelled, then clean up.
    pub async fn run(self, shutdown: CancellationToken) {
        let Daemon { config, dispatcher, listener, link_events } = self;
        let timer_check = config.timer_check;

        let listener_task = tokio::spawn(listener.run(shutdown.clone()));
        let expiry_task = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let shutdown = shutdown.clone();
            async move { dispatcher.run_expiry_loop(timer_check, shutdown).await }
        });
        let events_task = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let shutdown = shutdown.clone();
            async move { dispatcher.run_link_events(link_events, shutdown).await }
        });

        shutdown.cancelled().await;
        info!("shutting down dispatcher");

        for task in [listener_task, expiry_task, events_task] {
            if let Err(e) = task.await {
                warn!("background task failed: {}", e);
            }
        }

        let active = dispatcher.status().active_task_count();
        if active > 0 {
            warn!(active, "exiting with tasks still running on workers");
        }
        shutdown_cleanup(&config);
    }
}

fn shutdown_cleanup(config: &Config) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            warn!("failed to remove socket file: {}", e);
        }
    }
    info!("dispatcher shutdown complete");
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
