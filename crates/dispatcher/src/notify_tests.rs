// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::{ReleaseReason, TaskId, WorkerName};

fn released(id: &TaskId) -> TaskEvent {
    TaskEvent::Released {
        id: id.clone(),
        worker: WorkerName::new("w1"),
        reason: ReleaseReason::Completed,
    }
}

#[test]
fn publish_without_subscribers_is_fine() {
    let notifier = Notifier::new();
    notifier.publish(released(&TaskId::new()));
    assert_eq!(notifier.subscriber_count(), 0);
}

#[tokio::test]
async fn every_subscriber_sees_events_in_order() {
    let notifier = Notifier::new();
    let mut a = notifier.subscribe();
    let mut b = notifier.subscribe();
    let id = TaskId::new();

    let assigned = TaskEvent::Assigned {
        id: id.clone(),
        worker: WorkerName::new("w1"),
        target: "example.org".to_string(),
    };
    notifier.publish(assigned.clone());
    notifier.publish(released(&id));

    for rx in [&mut a, &mut b] {
        assert_eq!(rx.recv().await.unwrap(), assigned);
        assert_eq!(rx.recv().await.unwrap(), released(&id));
    }
}

#[tokio::test]
async fn late_subscribers_only_see_new_events() {
    let notifier = Notifier::new();
    notifier.publish(released(&TaskId::new()));

    let mut rx = notifier.subscribe();
    let id = TaskId::new();
    notifier.publish(released(&id));
    assert_eq!(rx.recv().await.unwrap().task_id(), &id);
}
