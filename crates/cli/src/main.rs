// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet`: operator CLI for the Fleet dispatcher.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod client_queries;
mod color;
mod commands;
mod exit_error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::{ClientError, DaemonClient};
use crate::commands::task::TaskArgs;
use crate::exit_error::{ExitError, EXIT_UNREACHABLE};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fleet", version, about = "Dispatch tasks to a fleet of worker agents")]
#[command(styles = color::styles())]
struct Cli {
    /// Dispatcher socket [default: $FLEET_STATE_DIR/fleetd.sock]
    #[arg(long, global = true, env = "FLEET_SOCKET")]
    socket: Option<PathBuf>,

    /// Administrator token
    #[arg(long, global = true, env = "FLEET_ADMIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a task on the first available worker
    Submit(TaskArgs),
    /// Run a task on every available worker
    SubmitAll(TaskArgs),
    /// Show workers and running tasks
    Status {
        #[arg(short = 'o', long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Make a worker eligible for new tasks
    Enable { worker: String },
    /// Take a worker out of rotation, releasing its task
    Disable { worker: String },
    /// Stop a running task
    Cancel { task_id: String },
    /// Stream task events
    Watch {
        #[arg(short = 'o', long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Check that the dispatcher is reachable
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(exit) = error.downcast_ref::<ExitError>() {
        return exit.code;
    }
    if let Some(client) = error.downcast_ref::<ClientError>() {
        return client.exit_code();
    }
    1
}

async fn run(cli: Cli) -> Result<()> {
    let client = connect(cli.socket, cli.token)?;
    match cli.command {
        Command::Submit(args) => commands::task::submit(&client, args).await,
        Command::SubmitAll(args) => commands::task::submit_all(&client, args).await,
        Command::Status { output } => commands::status::handle(&client, output).await,
        Command::Enable { worker } => commands::worker::set_enabled(&client, &worker, true).await,
        Command::Disable { worker } => {
            commands::worker::set_enabled(&client, &worker, false).await
        }
        Command::Cancel { task_id } => commands::task::cancel(&client, &task_id).await,
        Command::Watch { output } => commands::watch::handle(&client, output).await,
        Command::Ping => {
            client.ping().await?;
            println!("dispatcher is up at {}", client.socket().display());
            Ok(())
        }
    }
}

fn connect(socket: Option<PathBuf>, token: Option<String>) -> Result<DaemonClient, ExitError> {
    let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
        ExitError::new(EXIT_UNREACHABLE, "no admin token: pass --token or set FLEET_ADMIN_TOKEN")
    })?;
    let socket = match socket {
        Some(path) => path,
        None => fleet_dispatcher::env::state_dir()
            .map_err(|e| ExitError::new(EXIT_UNREACHABLE, e.to_string()))?
            .join("fleetd.sock"),
    };
    Ok(DaemonClient::new(socket, token))
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
