// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

/// Default control-channel address
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7171";

/// Token the dispatcher must present. Required.
pub fn agent_token() -> Option<String> {
    std::env::var("FLEET_AGENT_TOKEN").ok().filter(|s| !s.is_empty())
}

pub fn listen_addr() -> String {
    std::env::var("FLEET_AGENT_LISTEN")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
}

/// Payload executable (default `./payload`)
pub fn payload_path() -> PathBuf {
    std::env::var("FLEET_AGENT_PAYLOAD")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./payload"))
}

/// Resolve log directory: FLEET_AGENT_LOG_DIR > <state dir>/agent
pub fn log_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("FLEET_AGENT_LOG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(state_dir()?.join("agent"))
}

/// FLEET_STATE_DIR > XDG_STATE_HOME/fleet > ~/.local/state/fleet
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("FLEET_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fleet"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/fleet"))
}

/// Longest task duration this agent accepts (default one day)
pub fn max_duration_secs() -> u64 {
    std::env::var("FLEET_AGENT_MAX_DURATION_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(86_400)
}

/// SIGTERM to SIGKILL grace period (default 2s)
pub fn kill_grace() -> Duration {
    std::env::var("FLEET_AGENT_KILL_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// Handshake and write timeout on the control channel
pub fn ipc_timeout() -> Duration {
    std::env::var("FLEET_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
