// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of task events to operators.

use fleet_core::TaskEvent;
use tokio::sync::broadcast;

/// Events buffered per subscriber before the slowest one starts lagging
const EVENT_BUFFER: usize = 256;

/// Publishes [`TaskEvent`]s to the log and to every `watch` subscriber.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// only logged.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<TaskEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn publish(&self, event: TaskEvent) {
        match &event {
            TaskEvent::ForwardFailed { .. } => tracing::warn!("{}", event.log_summary()),
            _ => tracing::info!("{}", event.log_summary()),
        }
        // Err only means nobody is watching
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
