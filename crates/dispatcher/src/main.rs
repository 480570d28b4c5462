// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetd`: the Fleet dispatcher daemon.

use std::process::ExitCode;

use fleet_dispatcher::{startup, Config};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fleetd: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("fleetd: cannot open log in {}: {e}", config.state_dir.display());
            return ExitCode::FAILURE;
        }
    };

    let daemon = match startup(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            eprintln!("fleetd: {e}");
            return ExitCode::FAILURE;
        }
    };
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

    daemon.run(shutdown).await;
    ExitCode::SUCCESS
}

/// Log to `fleetd.log` in the state directory, filtered by `RUST_LOG`.
fn init_logging(config: &Config) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file_name = config.log_path.file_name().unwrap_or(std::ffi::OsStr::new("fleetd.log"));
    let appender = tracing_appender::rolling::never(&config.state_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(guard)
}
