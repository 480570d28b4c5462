// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the dispatcher crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;
use crate::dispatcher::DEFAULT_MAX_DURATION_SECS;

/// Resolve state directory: FLEET_STATE_DIR > XDG_STATE_HOME/fleet > ~/.local/state/fleet
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fleet"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/fleet"))
}

/// The single administrator token operators must present. Required.
pub fn admin_token() -> Option<String> {
    std::env::var("FLEET_ADMIN_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Worker registry file override
pub fn workers_file() -> Option<PathBuf> {
    std::env::var("FLEET_WORKERS_FILE").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// TCP port for remote operators, in addition to the Unix socket.
pub fn tcp_port() -> Option<u16> {
    std::env::var("FLEET_TCP_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// Grace added to a task's duration before it is considered lost (default 10s).
pub fn expiry_slack() -> Duration {
    std::env::var("FLEET_EXPIRY_SLACK_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10))
}

/// Longest task duration accepted for dispatch (default one day).
pub fn max_duration_secs() -> u64 {
    std::env::var("FLEET_MAX_DURATION_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_DURATION_SECS)
}

/// Pause between forwards of a broadcast (default 1s, zero allowed).
pub fn launch_delay() -> Duration {
    millis_var("FLEET_LAUNCH_DELAY_MS").unwrap_or(Duration::from_secs(1))
}

/// Upper bound on how long the expiry loop sleeps
pub fn timer_check() -> Duration {
    millis_var("FLEET_TIMER_CHECK_MS").unwrap_or(Duration::from_millis(500))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    millis_var("FLEET_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for each step of talking to a worker agent
pub fn forward_timeout() -> Duration {
    millis_var("FLEET_FORWARD_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

fn millis_var(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}
