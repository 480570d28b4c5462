// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential specs
//!
//! Both channels drop peers that present the wrong token without replying.

use crate::prelude::*;
use fleet_wire::ProtocolError;

#[tokio::test]
#[serial]
async fn operator_with_wrong_token_gets_no_reply() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exit 0")]).await;

    let result = fleet.request_as("guess", Request::Submit { task: TaskSpec::new("x", 5) }).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)), "got {result:?}");

    let status = fleet.status().await;
    assert_eq!(status.available_count(), 1);
    assert!(fleet.agent("w1").running().is_none());
}

#[tokio::test]
#[serial]
async fn agent_refuses_dispatcher_with_wrong_worker_token() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exit 0").wrong_registry_token()]).await;
    let mut watcher = fleet.watch().await;

    let reply = fleet.request(Request::Submit { task: TaskSpec::new("x", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Transport, .. }), "got {reply:?}");

    let assigned = watcher.next().await;
    assert!(matches!(assigned, TaskEvent::Assigned { .. }));
    let events = watcher.until_released(assigned.task_id()).await;
    assert!(matches!(events.first(), Some(TaskEvent::ForwardFailed { .. })));
    assert_eq!(release_reason(&events), Some(ReleaseReason::ForwardFailed));

    assert!(fleet.agent("w1").running().is_none());
    assert_eq!(fleet.status().await.available_count(), 1);
}
