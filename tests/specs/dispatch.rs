// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch specs
//!
//! Tasks reach a worker's payload, progress flows back to watchers, and the
//! worker returns to the idle pool when the payload exits.

use crate::prelude::*;

const REPORTING_PAYLOAD: &str = r#"
echo "Status: [phase one]"
echo "target=$1 duration=$2 id=$FLEET_TASK_ID"
echo "Status: [phase two]"
exit 3
"#;

#[tokio::test]
#[serial]
async fn submitted_task_reports_progress_and_frees_worker() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", REPORTING_PAYLOAD)]).await;
    let mut watcher = fleet.watch().await;

    let (task_id, worker) = fleet.submit("db-1", 30).await;
    assert_eq!(worker, "w1");

    let events = watcher.until_released(&task_id).await;
    let w1 = WorkerName::new("w1");
    assert_eq!(
        events,
        vec![
            TaskEvent::Assigned { id: task_id.clone(), worker: w1.clone(), target: "db-1".into() },
            TaskEvent::Progress {
                id: task_id.clone(),
                worker: w1.clone(),
                message: "phase one".into()
            },
            TaskEvent::Progress {
                id: task_id.clone(),
                worker: w1.clone(),
                message: "phase two".into()
            },
            TaskEvent::Completed { id: task_id.clone(), worker: w1.clone(), exit_code: Some(3) },
            TaskEvent::Released {
                id: task_id.clone(),
                worker: w1,
                reason: ReleaseReason::Completed
            },
        ]
    );

    let status = fleet.status().await;
    assert_eq!(status.available_count(), 1);
    assert_eq!(status.active_task_count(), 0);

    let log = fleet.task_log("w1", &task_id);
    assert!(log.contains(&format!("target=db-1 duration=30 id={task_id}")), "log:\n{log}");
}

#[tokio::test]
#[serial]
async fn worker_takes_a_new_task_after_completion() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exit 0")]).await;
    let mut watcher = fleet.watch().await;

    let (first, _) = fleet.submit("a", 5).await;
    watcher.until_released(&first).await;
    let (second, worker) = fleet.submit("b", 5).await;

    assert_ne!(first, second);
    assert_eq!(worker, "w1");
    let events = watcher.until_released(&second).await;
    assert_eq!(release_reason(&events), Some(ReleaseReason::Completed));
}

#[tokio::test]
#[serial]
async fn submit_all_runs_on_every_ready_worker() {
    let fleet = Fleet::start(vec![
        WorkerSetup::new("w1", "echo 'Status: [hi]'"),
        WorkerSetup::new("w2", "echo 'Status: [hi]'"),
        WorkerSetup::new("w3", "echo 'Status: [hi]'").disabled(),
    ])
    .await;
    let mut watcher = fleet.watch().await;

    let task = TaskSpec::new("all-hosts", 10);
    let Response::Launched { count, task_ids } = fleet.request(Request::SubmitAll { task }).await
    else {
        panic!("expected launched");
    };
    assert_eq!(count, 2);
    assert_eq!(task_ids.len(), 2);

    let mut workers = Vec::new();
    for id in &task_ids {
        let events = watcher.until_released(id).await;
        if let Some(TaskEvent::Assigned { worker, .. }) = events.first() {
            workers.push(worker.to_string());
        }
        assert_eq!(release_reason(&events), Some(ReleaseReason::Completed));
    }
    workers.sort();
    assert_eq!(workers, vec!["w1", "w2"]);
}

#[tokio::test]
#[serial]
async fn busy_fleet_reports_capacity() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exec sleep 30")]).await;

    let (task_id, _) = fleet.submit("long", 60).await;
    let status = fleet.status().await;
    assert_eq!(status.available_count(), 0);
    assert_eq!(status.tasks.len(), 1);
    assert_eq!(status.tasks[0].id, task_id);
    assert_eq!(status.worker("w1").and_then(|w| w.task_id.clone()), Some(task_id.clone()));

    let reply = fleet.request(Request::Submit { task: TaskSpec::new("more", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Capacity, .. }), "got {reply:?}");

    let reply = fleet.request(Request::SubmitAll { task: TaskSpec::new("more", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Capacity, .. }));

    assert_eq!(fleet.request(Request::Cancel { task_id }).await, Response::Ok);
}

#[tokio::test]
#[serial]
async fn malformed_task_is_rejected_before_any_worker_is_used() {
    let fleet = Fleet::start(vec![WorkerSetup::new("w1", "exit 0")]).await;

    let reply = fleet.request(Request::Submit { task: TaskSpec::new("", 5) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Validation, .. }));

    let reply = fleet.request(Request::Submit { task: TaskSpec::new("db", 0) }).await;
    assert!(matches!(reply, Response::Error { kind: ErrorKind::Validation, .. }));

    assert_eq!(fleet.status().await.available_count(), 1);
    assert!(fleet.agent("w1").running().is_none());
}
