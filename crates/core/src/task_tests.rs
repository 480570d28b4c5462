// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn valid_task_passes() {
    let task = TaskSpec::new("db-backup", 30).args(["--fast", "eu-west"]);
    assert_eq!(task.validate(), Ok(()));
}

#[yare::parameterized(
    empty_target  = { "",        30, TaskError::EmptyTarget },
    blank_target  = { "   ",     30, TaskError::EmptyTarget },
    control_chars = { "a\nb",    30, TaskError::ControlCharacters },
    zero_duration = { "target",  0,  TaskError::ZeroDuration },
)]
fn invalid_tasks_are_rejected(target: &str, duration: u64, expected: TaskError) {
    assert_eq!(TaskSpec::new(target, duration).validate(), Err(expected));
}

#[test]
fn overlong_target_is_rejected() {
    let task = TaskSpec::new("x".repeat(MAX_TARGET_LEN + 1), 1);
    assert_eq!(task.validate(), Err(TaskError::TargetTooLong));
}

#[test]
fn nul_in_argument_reports_index() {
    let task = TaskSpec::new("t", 1).args(["ok", "bad\0"]);
    assert_eq!(task.validate(), Err(TaskError::NulInArgument { index: 1 }));
}

#[test]
fn duration_limit_is_enforced() {
    let task = TaskSpec::new("t", 120);
    assert_eq!(task.validate_with_limit(120), Ok(()));
    assert_eq!(
        task.validate_with_limit(60),
        Err(TaskError::DurationTooLong { secs: 120, max: 60 })
    );
}

#[test]
fn empty_args_are_omitted_from_json() {
    let json = serde_json::to_value(TaskSpec::new("t", 5)).unwrap();
    assert_eq!(json, serde_json::json!({"target": "t", "duration_secs": 5}));
    let back: TaskSpec = serde_json::from_value(json).unwrap();
    assert!(back.args.is_empty());
}

#[yare::parameterized(
    bare    = { "30",   30 },
    secs    = { "30s",  30 },
    mins    = { "5m",   300 },
    min     = { "2min", 120 },
    hours   = { "1h",   3600 },
    spaced  = { " 7s ", 7 },
)]
fn parse_duration_accepts(input: &str, expected: u64) {
    assert_eq!(parse_duration_secs(input), Ok(expected));
}

#[yare::parameterized(
    empty   = { "" },
    suffix  = { "30x" },
    letters = { "abc" },
    negative = { "-5" },
)]
fn parse_duration_rejects(input: &str) {
    assert!(matches!(parse_duration_secs(input), Err(TaskError::InvalidDuration(_))));
}
