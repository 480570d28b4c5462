// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: shared types for the Fleet dispatcher, agent and CLI

pub mod macros;

pub mod clock;
pub mod event;
pub mod id;
pub mod task;
pub mod time_fmt;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{ProgressEvent, ReleaseReason, TaskEvent};
pub use task::{parse_duration_secs, TaskError, TaskId, TaskRecord, TaskSpec};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
pub use worker::{WorkerName, WorkerRecord, WorkerState};
