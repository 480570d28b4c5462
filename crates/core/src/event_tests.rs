// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id() -> TaskId {
    TaskId::from_string("tsk-1")
}

#[test]
fn task_event_uses_type_tag() {
    let event = TaskEvent::Released {
        id: id(),
        worker: "w1".into(),
        reason: ReleaseReason::Expired,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "task:released",
            "id": "tsk-1",
            "worker": "w1",
            "reason": "expired",
        })
    );
}

#[test]
fn progress_event_completed_without_code() {
    let json = r#"{"kind":"completed","exit_code":null}"#;
    let event: ProgressEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event, ProgressEvent::Completed { exit_code: None });
    assert!(event.is_terminal());
    assert!(!ProgressEvent::Progress { message: "x".into() }.is_terminal());
}

fn w1() -> WorkerName {
    WorkerName::new("w1")
}

#[yare::parameterized(
    assigned = {
        TaskEvent::Assigned { id: id(), worker: w1(), target: "t".into() },
        "task:assigned id=tsk-1 worker=w1 target=t"
    },
    progress = {
        TaskEvent::Progress { id: id(), worker: w1(), message: "50%".into() },
        "task:progress id=tsk-1 worker=w1 50%"
    },
    exit_code = {
        TaskEvent::Completed { id: id(), worker: w1(), exit_code: Some(3) },
        "task:completed id=tsk-1 worker=w1 exit=3"
    },
    signalled = {
        TaskEvent::Completed { id: id(), worker: w1(), exit_code: None },
        "task:completed id=tsk-1 worker=w1 exit=signal"
    },
    released = {
        TaskEvent::Released { id: id(), worker: w1(), reason: ReleaseReason::Disabled },
        "task:released id=tsk-1 worker=w1 reason=disabled"
    },
    forward_failed = {
        TaskEvent::ForwardFailed { id: id(), worker: w1(), error: "refused".into() },
        "task:forward_failed id=tsk-1 worker=w1 error=refused"
    },
)]
fn log_summary_formats(event: TaskEvent, expected: &str) {
    assert_eq!(event.log_summary(), expected);
    assert_eq!(event.task_id(), "tsk-1");
}
