// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Command handlers return `ExitError` rather than exiting directly, so
//! `main()` owns process termination.

use std::fmt;

use fleet_wire::ErrorKind;

/// Could not reach or authenticate with the dispatcher.
pub const EXIT_UNREACHABLE: i32 = 2;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit code for a request the dispatcher refused.
    pub fn code_for(kind: ErrorKind) -> i32 {
        match kind {
            ErrorKind::Validation => 64,
            ErrorKind::Capacity => 75,
            ErrorKind::UnknownWorker | ErrorKind::UnknownTask => 66,
            ErrorKind::Transport => 69,
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExitError {}
