// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker names and registry records.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique, operator-chosen name of a worker agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerName(String);

impl WorkerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for WorkerName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkerName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for WorkerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A registered worker as seen by the dispatcher.
///
/// A disabled worker is never busy: [`WorkerRecord::set_enabled`] clears
/// `busy` when disabling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: WorkerName,
    /// Address of the worker's control channel (`host:port`)
    pub endpoint: String,
    pub enabled: bool,
    pub busy: bool,
}

impl WorkerRecord {
    pub fn new(name: impl Into<WorkerName>, endpoint: impl Into<String>) -> Self {
        Self { name: name.into(), endpoint: endpoint.into(), enabled: true, busy: false }
    }

    /// Enabled and not running anything.
    pub fn is_idle(&self) -> bool {
        self.enabled && !self.busy
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.busy = false;
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_flags(self.enabled, self.busy)
    }
}

/// Operator-facing summary of a worker's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Ready,
    Busy,
    Disabled,
}

impl WorkerState {
    pub fn from_flags(enabled: bool, busy: bool) -> Self {
        match (enabled, busy) {
            (false, _) => WorkerState::Disabled,
            (true, true) => WorkerState::Busy,
            (true, false) => WorkerState::Ready,
        }
    }
}

crate::simple_display! {
    WorkerState {
        Ready => "ready",
        Busy => "busy",
        Disabled => "disabled",
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
