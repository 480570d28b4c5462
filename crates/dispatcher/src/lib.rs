// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet dispatcher: worker registry, task dispatch and the operator socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod link;
pub mod listener;
pub mod notify;
pub mod registry;
pub mod scheduler;

pub use config::{Config, ConfigError, WorkerConfig};
pub use dispatcher::{DispatchSettings, Dispatcher, Launched, Submitted};
pub use error::DispatchError;
pub use lifecycle::{startup, Daemon, DaemonDispatcher, LifecycleError};
pub use link::{LinkError, LinkEvent, TcpWorkerLink, WorkerLink};
pub use listener::{ListenCtx, Listener};
pub use notify::Notifier;
pub use registry::Registry;

#[cfg(any(test, feature = "test-support"))]
pub use link::{FakeWorkerLink, ForwardCall};
