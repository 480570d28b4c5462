// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness that boots a dispatcher plus one agent per worker.

use std::collections::VecDeque;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fleet_agent::{Agent, AgentServer, AgentSettings, ServerCtx, TaskLogger};
use fleet_dispatcher::{startup, Config};
use fleet_wire::{read_frame, read_message, write_frame, ProtocolError, PROTOCOL_VERSION};
use tempfile::TempDir;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, UnixStream};
use tokio_util::sync::CancellationToken;

pub use fleet_core::{ReleaseReason, TaskEvent, TaskId, TaskSpec, WorkerName};
pub use fleet_wire::{ErrorKind, Request, Response, StatusSnapshot};
pub use serial_test::serial;
pub use std::time::Duration;

pub const ADMIN: &str = "admin-token";
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// One worker: its payload script and the tokens on either side.
pub struct WorkerSetup {
    name: String,
    payload: String,
    agent_token: String,
    registry_token: String,
    enabled: bool,
}

impl WorkerSetup {
    pub fn new(name: &str, payload: &str) -> Self {
        let token = format!("{name}-secret");
        Self {
            name: name.to_string(),
            payload: payload.to_string(),
            agent_token: token.clone(),
            registry_token: token,
            enabled: true,
        }
    }

    /// Register the worker with a token its agent will not accept.
    pub fn wrong_registry_token(mut self) -> Self {
        self.registry_token = "not-the-agent-token".to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

pub struct Fleet {
    dir: TempDir,
    socket: PathBuf,
    agents: Vec<(String, Agent)>,
    shutdown: CancellationToken,
}

impl Fleet {
    pub async fn start(workers: Vec<WorkerSetup>) -> Self {
        Self::start_with(workers, |_| {}).await
    }

    /// Boot agents and a dispatcher; `tune` adjusts the dispatcher config.
    pub async fn start_with(workers: Vec<WorkerSetup>, tune: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let shutdown = CancellationToken::new();
        let mut agents = Vec::new();
        let mut registry = String::new();

        for worker in &workers {
            let home = dir.path().join(&worker.name);
            std::fs::create_dir_all(&home).unwrap();
            let settings = AgentSettings {
                payload: write_script(&home, &worker.payload),
                max_duration_secs: 3600,
                kill_grace: Duration::from_millis(300),
            };
            let agent = Agent::new(settings, TaskLogger::new(home.join("logs")));
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let ctx = ServerCtx {
                agent: agent.clone(),
                token: worker.agent_token.clone(),
                ipc_timeout: TIMEOUT,
            };
            let server = AgentServer::new(listener, ctx);
            let endpoint = server.local_addr().unwrap();
            tokio::spawn(server.run(shutdown.clone()));
            agents.push((worker.name.clone(), agent));

            registry.push_str(&format!(
                "[[worker]]\nname = \"{}\"\nendpoint = \"{}\"\ntoken = \"{}\"\nenabled = {}\n\n",
                worker.name, endpoint, worker.registry_token, worker.enabled
            ));
        }

        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        let mut config = Config::for_state_dir(state_dir.clone(), ADMIN.to_string());
        config.workers_path = state_dir.join("workers.toml");
        config.tcp_port = None;
        config.settings.launch_delay = Duration::from_millis(50);
        config.timer_check = Duration::from_millis(50);
        config.ipc_timeout = TIMEOUT;
        config.forward_timeout = TIMEOUT;
        tune(&mut config);
        std::fs::write(&config.workers_path, registry).unwrap();

        let socket = config.socket_path.clone();
        let daemon = startup(config).await.unwrap();
        tokio::spawn(daemon.run(shutdown.clone()));

        Fleet { dir, socket, agents, shutdown }
    }

    async fn connect(&self, token: &str) -> Result<(OwnedReadHalf, OwnedWriteHalf), ProtocolError> {
        let (mut reader, mut writer) = UnixStream::connect(&self.socket).await?.into_split();
        let hello = Request::Hello { version: PROTOCOL_VERSION.to_string(), token: token.into() };
        write_frame(&mut writer, &hello, TIMEOUT).await?;
        let reply: Response = read_frame(&mut reader, TIMEOUT).await?;
        assert!(matches!(reply, Response::Hello { .. }), "handshake reply: {reply:?}");
        Ok((reader, writer))
    }

    /// Authenticate with `token` and send one request.
    pub async fn request_as(
        &self,
        token: &str,
        request: Request,
    ) -> Result<Response, ProtocolError> {
        let (mut reader, mut writer) = self.connect(token).await?;
        write_frame(&mut writer, &request, TIMEOUT).await?;
        read_frame(&mut reader, TIMEOUT).await
    }

    pub async fn request(&self, request: Request) -> Response {
        self.request_as(ADMIN, request).await.unwrap()
    }

    pub async fn submit(&self, target: &str, duration_secs: u64) -> (TaskId, WorkerName) {
        let task = TaskSpec::new(target, duration_secs);
        match self.request(Request::Submit { task }).await {
            Response::Submitted { task_id, worker } => (task_id, worker),
            other => panic!("submit failed: {other:?}"),
        }
    }

    pub async fn status(&self) -> StatusSnapshot {
        match self.request(Request::Status).await {
            Response::Status { status } => status,
            other => panic!("status failed: {other:?}"),
        }
    }

    /// Subscribe to task events; everything published after this returns is seen.
    pub async fn watch(&self) -> Watcher {
        let (mut reader, mut writer) = self.connect(ADMIN).await.unwrap();
        write_frame(&mut writer, &Request::Watch, TIMEOUT).await.unwrap();
        let ack: Response = read_frame(&mut reader, TIMEOUT).await.unwrap();
        assert_eq!(ack, Response::Ok);
        Watcher { reader, _writer: writer, backlog: VecDeque::new() }
    }

    pub fn agent(&self, worker: &str) -> &Agent {
        self.agents.iter().find(|(name, _)| name == worker).map(|(_, a)| a).unwrap()
    }

    /// Raw output the worker's agent recorded for a task.
    pub fn task_log(&self, worker: &str, task_id: &TaskId) -> String {
        let path = self.dir.path().join(worker).join("logs/task").join(format!("{task_id}.log"));
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub struct Watcher {
    reader: OwnedReadHalf,
    _writer: OwnedWriteHalf,
    /// Events skipped by `until_released`, replayed first
    backlog: VecDeque<TaskEvent>,
}

impl Watcher {
    pub async fn next(&mut self) -> TaskEvent {
        if let Some(event) = self.backlog.pop_front() {
            return event;
        }
        let bytes = tokio::time::timeout(TIMEOUT, read_message(&mut self.reader))
            .await
            .expect("no event in time")
            .unwrap();
        match fleet_wire::decode(&bytes).unwrap() {
            Response::Event { event } => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    /// Collect events for `task_id` up to and including its release.
    ///
    /// Events for other tasks stay queued for later calls.
    pub async fn until_released(&mut self, task_id: &TaskId) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        let mut skipped = Vec::new();
        loop {
            let event = self.next().await;
            if event.task_id() != task_id {
                skipped.push(event);
                continue;
            }
            let done = matches!(event, TaskEvent::Released { .. });
            events.push(event);
            if done {
                for event in skipped.into_iter().rev() {
                    self.backlog.push_front(event);
                }
                return events;
            }
        }
    }
}

/// Write an executable `/bin/sh` payload.
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("payload.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

pub fn release_reason(events: &[TaskEvent]) -> Option<ReleaseReason> {
    events.iter().find_map(|e| match e {
        TaskEvent::Released { reason, .. } => Some(*reason),
        _ => None,
    })
}
