// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Release specs
//!
//! Cancel, disable and expiry each hand a busy worker back exactly once.

use crate::prelude::*;

const LONG_PAYLOAD: &str = "exec sleep 30";

#[tokio::test]
#[serial]
async fn cancel_stops_payload_and_frees_worker() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", LONG_PAYLOAD)]).await;
    let mut watcher = fleet.watch().await;

    let (task_id, _) = fleet.submit("long", 60).await;
    assert_eq!(fleet.agent("w1").running(), Some(task_id.clone()));

    let reply = fleet.request(Request::Cancel { task_id: task_id.clone() }).await;
    assert_eq!(reply, Response::Ok);

    let events = watcher.until_released(&task_id).await;
    assert_eq!(release_reason(&events), Some(ReleaseReason::Cancelled));
    assert!(fleet.agent("w1").wait_idle(TIMEOUT).await);
    assert_eq!(fleet.status().await.available_count(), 1);

    let reply = fleet.request(Request::Cancel { task_id }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::UnknownTask, .. }));
}

#[tokio::test]
#[serial]
async fn disabling_busy_worker_releases_its_task() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", LONG_PAYLOAD)]).await;
    let mut watcher = fleet.watch().await;

    let (task_id, _) = fleet.submit("long", 60).await;
    let reply = fleet.request(Request::Disable { worker: WorkerName::new("w1") }).await;
    assert_eq!(reply, Response::Ok);

    let events = watcher.until_released(&task_id).await;
    assert_eq!(release_reason(&events), Some(ReleaseReason::Disabled));
    assert!(fleet.agent("w1").wait_idle(TIMEOUT).await);

    let status = fleet.status().await;
    let w1 = status.worker("w1").unwrap();
    assert!(!w1.enabled && !w1.busy);
    assert_eq!(status.active_task_count(), 0);

    let reply = fleet.request(Request::Submit { task: TaskSpec::new("x", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Capacity, .. }));

    let reply = fleet.request(Request::Enable { worker: WorkerName::new("w1") }).await;
    assert_eq!(reply, Response::Ok);
    assert_eq!(fleet.status().await.available_count(), 1);
}

#[tokio::test]
#[serial]
async fn unknown_worker_is_reported() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exit 0")]).await;

    let reply = fleet.request(Request::Enable { worker: WorkerName::new("nope") }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::UnknownWorker, .. }));
}

#[tokio::test]
#[serial]
async fn silent_worker_is_released_when_task_expires() {
    let fleet = Fleet::start_with(vec![WorkerSetup::new("w1", LONG_PAYLOAD)], |config| {
        config.settings.expiry_slack = Duration::from_millis(200);
    })
    .await;
    let mut watcher = fleet.watch().await;

    let (task_id, _) = fleet.submit("short", 1).await;
    let events = watcher.until_released(&task_id).await;
    assert_eq!(release_reason(&events), Some(ReleaseReason::Expired));
    assert_eq!(fleet.status().await.available_count(), 1);

    // The agent is still running the old payload and refuses more work
    let reply = fleet.request(Request::Submit { task: TaskSpec::new("next", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Transport, .. }), "got {reply:?}");
    let assigned = watcher.next().await;
    let events = watcher.until_released(assigned.task_id()).await;
    assert!(matches!(events.first(), Some(TaskEvent::ForwardFailed { .. })));
    assert_eq!(release_reason(&events), Some(ReleaseReason::ForwardFailed));
    assert_eq!(fleet.status().await.available_count(), 1);
}
