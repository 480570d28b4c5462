// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::agent::AgentSettings;
use crate::env;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("FLEET_AGENT_TOKEN must be set")]
    MissingToken,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Credential the dispatcher must present
    pub token: String,
    /// Control-channel bind address
    pub listen: String,
    /// Root for `agent.log` and per-task logs
    pub log_dir: PathBuf,
    pub settings: AgentSettings,
    pub ipc_timeout: Duration,
}

impl AgentConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let token = env::agent_token().ok_or(ConfigError::MissingToken)?;
        Ok(Self {
            token,
            listen: env::listen_addr(),
            log_dir: env::log_dir()?,
            settings: AgentSettings {
                payload: env::payload_path(),
                max_duration_secs: env::max_duration_secs(),
                kill_grace: env::kill_grace(),
            },
            ipc_timeout: env::ipc_timeout(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
