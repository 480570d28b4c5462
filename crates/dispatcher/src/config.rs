// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher configuration: paths, credentials and the worker registry file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_core::{WorkerName, WorkerRecord};
use serde::Deserialize;
use thiserror::Error;

use crate::dispatcher::DispatchSettings;
use crate::env;

/// Configuration errors. All of them stop the daemon at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("FLEET_ADMIN_TOKEN must be set")]
    MissingAdminToken,

    #[error("failed to read {path}: {source}")]
    ReadWorkers {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseWorkers {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("worker entry {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("worker {0} is listed more than once")]
    DuplicateWorker(String),
}

/// One `[[worker]]` entry of the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    /// `host:port` of the agent's control channel
    pub endpoint: String,
    /// Credential the agent expects in its handshake
    pub token: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl WorkerConfig {
    pub fn record(&self) -> WorkerRecord {
        let mut record = WorkerRecord::new(self.name.as_str(), self.endpoint.as_str());
        record.set_enabled(self.enabled);
        record
    }
}

#[derive(Debug, Deserialize)]
struct WorkersFile {
    #[serde(default, rename = "worker")]
    workers: Vec<WorkerConfig>,
}

/// Parse registry file contents. `path` is only used in error messages.
pub fn parse_workers(text: &str, path: &Path) -> Result<Vec<WorkerConfig>, ConfigError> {
    let file: WorkersFile = toml::from_str(text)
        .map_err(|source| ConfigError::ParseWorkers { path: path.to_path_buf(), source })?;

    let mut seen = HashSet::new();
    for (index, worker) in file.workers.iter().enumerate() {
        for (field, value) in
            [("name", &worker.name), ("endpoint", &worker.endpoint), ("token", &worker.token)]
        {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field });
            }
        }
        if !seen.insert(worker.name.as_str()) {
            return Err(ConfigError::DuplicateWorker(worker.name.clone()));
        }
    }
    Ok(file.workers)
}

/// Load the registry file. A missing file means no workers.
pub fn load_workers(path: &Path) -> Result<Vec<WorkerConfig>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_workers(&text, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "worker registry not found, starting empty");
            Ok(Vec::new())
        }
        Err(source) => Err(ConfigError::ReadWorkers { path: path.to_path_buf(), source }),
    }
}

/// Per-worker tokens for the worker-control channel.
pub fn credentials(workers: &[WorkerConfig]) -> HashMap<WorkerName, String> {
    workers.iter().map(|w| (WorkerName::new(w.name.as_str()), w.token.clone())).collect()
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/fleet)
    pub state_dir: PathBuf,
    /// Operator Unix socket
    pub socket_path: PathBuf,
    /// Daemon log file
    pub log_path: PathBuf,
    /// TOML worker registry
    pub workers_path: PathBuf,
    pub admin_token: String,
    pub tcp_port: Option<u16>,
    pub settings: DispatchSettings,
    pub timer_check: Duration,
    pub ipc_timeout: Duration,
    pub forward_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = env::state_dir()?;
        let admin_token = env::admin_token().ok_or(ConfigError::MissingAdminToken)?;
        Ok(Self::for_state_dir(state_dir, admin_token))
    }

    /// Configuration rooted at `state_dir`, with timings from the environment.
    pub fn for_state_dir(state_dir: PathBuf, admin_token: String) -> Self {
        Self {
            socket_path: state_dir.join("fleetd.sock"),
            log_path: state_dir.join("fleetd.log"),
            workers_path: env::workers_file().unwrap_or_else(|| state_dir.join("workers.toml")),
            admin_token,
            tcp_port: env::tcp_port(),
            settings: DispatchSettings {
                expiry_slack: env::expiry_slack(),
                launch_delay: env::launch_delay(),
                max_duration_secs: env::max_duration_secs(),
            },
            timer_check: env::timer_check(),
            ipc_timeout: env::ipc_timeout(),
            forward_timeout: env::forward_timeout(),
            state_dir,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
