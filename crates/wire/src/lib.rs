// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet wire protocols.
//!
//! Two protocols share one framing (4-byte big-endian length prefix + JSON
//! payload):
//!
//! - operator protocol: CLI ⇄ dispatcher ([`Request`], [`Response`])
//! - worker-control protocol: dispatcher ⇄ agent ([`AgentRequest`],
//!   [`AgentResponse`])
//!
//! Every connection opens with a `Hello` carrying a token. A peer that sees a
//! wrong token closes the connection without replying.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod agent;
mod request;
mod response;
mod status;
mod token;
mod wire;

pub use agent::{AgentErrorKind, AgentRequest, AgentResponse};
pub use request::Request;
pub use response::{ErrorKind, Response};
pub use status::{StatusSnapshot, TaskEntry, WorkerEntry};
pub use token::token_matches;
pub use wire::{
    decode, encode, read_frame, read_message, write_frame, write_message, ProtocolError,
    MAX_MESSAGE_SIZE,
};

/// Protocol version exchanged in `Hello` (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
