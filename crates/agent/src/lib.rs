// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet worker agent: accepts one task at a time from the dispatcher, runs
//! the payload and reports its progress.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent;
pub mod config;
pub mod env;
pub mod executor;
pub mod progress;
pub mod server;
pub mod task_log;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, AgentError, AgentSettings};
pub use config::{AgentConfig, ConfigError};
pub use executor::{spawn_payload, TaskRun};
pub use progress::parse_progress;
pub use server::{AgentServer, ServerCtx};
pub use task_log::{TaskLog, TaskLogger};
