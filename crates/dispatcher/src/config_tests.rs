// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

const TIMING_VARS: &[&str] = &[
    "FLEET_WORKERS_FILE",
    "FLEET_TCP_PORT",
    "FLEET_EXPIRY_SLACK_SECS",
    "FLEET_LAUNCH_DELAY_MS",
    "FLEET_TIMER_CHECK_MS",
    "FLEET_IPC_TIMEOUT_MS",
    "FLEET_FORWARD_TIMEOUT_MS",
    "FLEET_MAX_DURATION_SECS",
];

fn clear_env() {
    for var in TIMING_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn parses_worker_entries_in_order() {
    let text = r#"
        [[worker]]
        name = "w1"
        endpoint = "10.0.0.5:7171"
        token = "alpha"

        [[worker]]
        name = "w2"
        endpoint = "10.0.0.6:7171"
        token = "beta"
        enabled = false
    "#;

    let workers = parse_workers(text, Path::new("workers.toml")).unwrap();

    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0].name, "w1");
    assert!(workers[0].enabled);
    assert!(!workers[1].enabled);
    assert!(!workers[1].record().enabled);

    let creds = credentials(&workers);
    assert_eq!(creds.get("w2").map(String::as_str), Some("beta"));
}

#[test]
fn empty_file_means_no_workers() {
    assert!(parse_workers("", Path::new("workers.toml")).unwrap().is_empty());
}

#[parameterized(
    name = { r#"name = "" "#, "name" },
    endpoint = { r#"endpoint = " " "#, "endpoint" },
    token = { r#"token = "" "#, "token" },
)]
fn empty_fields_are_rejected(override_line: &str, expected: &str) {
    let mut fields = vec![
        ("name", r#"name = "w1""#.to_string()),
        ("endpoint", r#"endpoint = "h:1""#.to_string()),
        ("token", r#"token = "t""#.to_string()),
    ];
    for (field, line) in fields.iter_mut() {
        if *field == expected {
            *line = override_line.to_string();
        }
    }
    let body: Vec<_> = fields.into_iter().map(|(_, line)| line).collect();
    let text = format!("[[worker]]\n{}\n", body.join("\n"));

    let err = parse_workers(&text, Path::new("w.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyField { index: 0, field } if field == expected));
}

#[test]
fn duplicate_names_are_rejected() {
    let text = r#"
        [[worker]]
        name = "w1"
        endpoint = "a:1"
        token = "t"

        [[worker]]
        name = "w1"
        endpoint = "b:1"
        token = "t"
    "#;
    let err = parse_workers(text, Path::new("w.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateWorker(name) if name == "w1"));
}

#[test]
fn malformed_toml_names_the_file() {
    let err = parse_workers("[[worker]\n", Path::new("/etc/fleet/workers.toml")).unwrap_err();
    assert!(err.to_string().contains("/etc/fleet/workers.toml"));
}

#[test]
fn missing_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let workers = load_workers(&dir.path().join("absent.toml")).unwrap();
    assert!(workers.is_empty());
}

#[test]
fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workers.toml");
    let text = "[[worker]]\nname = \"w1\"\nendpoint = \"h:1\"\ntoken = \"t\"\n";
    std::fs::write(&path, text).unwrap();

    let workers = load_workers(&path).unwrap();
    assert_eq!(workers[0].record(), WorkerRecord::new("w1", "h:1"));
}

#[test]
#[serial]
fn defaults_without_overrides() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let config = Config::for_state_dir(dir.path().to_path_buf(), "admin".to_string());

    assert_eq!(config.socket_path, dir.path().join("fleetd.sock"));
    assert_eq!(config.log_path, dir.path().join("fleetd.log"));
    assert_eq!(config.workers_path, dir.path().join("workers.toml"));
    assert_eq!(config.tcp_port, None);
    assert_eq!(config.settings, DispatchSettings::default());
    assert_eq!(config.timer_check, Duration::from_millis(500));
    assert_eq!(config.ipc_timeout, Duration::from_secs(5));
    assert_eq!(config.forward_timeout, Duration::from_secs(10));
}

#[test]
#[serial]
fn environment_overrides_timings() {
    clear_env();
    std::env::set_var("FLEET_EXPIRY_SLACK_SECS", "3");
    std::env::set_var("FLEET_LAUNCH_DELAY_MS", "0");
    std::env::set_var("FLEET_TCP_PORT", "7070");
    std::env::set_var("FLEET_WORKERS_FILE", "/srv/fleet/workers.toml");
    std::env::set_var("FLEET_MAX_DURATION_SECS", "600");

    let config = Config::for_state_dir(PathBuf::from("/tmp/fleet"), "admin".to_string());
    clear_env();

    assert_eq!(config.settings.expiry_slack, Duration::from_secs(3));
    assert_eq!(config.settings.launch_delay, Duration::ZERO);
    assert_eq!(config.settings.max_duration_secs, 600);
    assert_eq!(config.tcp_port, Some(7070));
    assert_eq!(config.workers_path, PathBuf::from("/srv/fleet/workers.toml"));
}

#[test]
#[serial]
fn admin_token_is_required() {
    std::env::set_var("FLEET_STATE_DIR", "/tmp/fleet-test");
    std::env::remove_var("FLEET_ADMIN_TOKEN");

    let result = Config::load();
    std::env::remove_var("FLEET_STATE_DIR");

    assert!(matches!(result, Err(ConfigError::MissingAdminToken)));
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    std::env::set_var("FLEET_STATE_DIR", "/tmp/fleet-explicit");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    let dir = env::state_dir().unwrap();
    std::env::remove_var("FLEET_STATE_DIR");

    assert_eq!(dir, PathBuf::from("/tmp/fleet-explicit"));
    assert_eq!(env::state_dir().unwrap(), PathBuf::from("/tmp/xdg/fleet"));
    std::env::remove_var("XDG_STATE_HOME");
}
