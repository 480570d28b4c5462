// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet-agent`: runs on each worker host and executes forwarded tasks.

use std::process::ExitCode;

use fleet_agent::{Agent, AgentConfig, AgentServer, ServerCtx, TaskLogger};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AgentConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fleet-agent: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("fleet-agent: cannot open log in {}: {e}", config.log_dir.display());
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(&config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(listen = %config.listen, "bind failed: {}", e);
            eprintln!("fleet-agent: cannot listen on {}: {e}", config.listen);
            return ExitCode::FAILURE;
        }
    };

    let agent = Agent::new(config.settings.clone(), TaskLogger::new(config.log_dir.clone()));
    let server = AgentServer::new(
        listener,
        ServerCtx { agent: agent.clone(), token: config.token, ipc_timeout: config.ipc_timeout },
    );
    tracing::info!(
        listen = %config.listen,
        payload = %config.settings.payload.display(),
        "agent started"
    );
    println!("READY");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
            }
            shutdown.cancel();
        }
    });

    server.run(shutdown).await;
    agent.shutdown().await;
    tracing::info!("agent stopped");
    ExitCode::SUCCESS
}

/// Log to `agent.log` under the log directory, filtered by `RUST_LOG`.
fn init_logging(config: &AgentConfig) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::never(&config.log_dir, "agent.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(guard)
}
