// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiry timers keyed by task id.
//!
//! The scheduler only stores deadlines. Whoever owns it polls
//! [`Scheduler::fired_timers`] with the current instant.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use fleet_core::TaskId;

/// Deadlines further out than this are clamped
const MAX_TIMER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<TaskId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer for `id` to fire `duration` after `now`.
    ///
    /// Durations are clamped to about a century so the deadline cannot
    /// overflow.
    pub fn set_timer(&mut self, id: TaskId, duration: Duration, now: Instant) {
        let duration = duration.min(MAX_TIMER);
        let deadline = now.checked_add(duration).unwrap_or(now);
        self.timers.insert(id, deadline);
    }

    /// Returns true if a timer was armed for `id`.
    pub fn cancel_timer(&mut self, id: &str) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TaskId> {
        let mut fired: Vec<(Instant, TaskId)> = Vec::new();
        self.timers.retain(|id, deadline| {
            if *deadline <= now {
                fired.push((*deadline, id.clone()));
                false
            } else {
                true
            }
        });
        fired.sort();
        fired.into_iter().map(|(_, id)| id).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    pub fn deadline(&self, id: &str) -> Option<Instant> {
        self.timers.get(id).copied()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
