// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload subprocess supervision.
//!
//! One [`TaskRun`] per launched subprocess. A supervisor task reads the
//! child's output line by line, turns progress markers into events, writes
//! everything else to the task log, and finishes with exactly one
//! `Completed`.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use fleet_core::{ProgressEvent, TaskId, TaskSpec};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::progress::parse_progress;
use crate::task_log::TaskLog;

/// Environment variable carrying the task id into the payload
pub const TASK_ID_ENV: &str = "FLEET_TASK_ID";

/// Events buffered before the supervisor waits on the consumer
const EVENT_BUFFER: usize = 64;

/// How long to keep reading output after the payload exits
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A running payload and its event stream.
///
/// Yields any number of `Progress` events, then one `Completed`, then `None`.
#[derive(Debug)]
pub struct TaskRun {
    task_id: TaskId,
    pid: Option<u32>,
    events: mpsc::Receiver<ProgressEvent>,
    cancel: CancellationToken,
}

impl TaskRun {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Token that stops the payload (SIGTERM, then SIGKILL after the grace period).
    pub fn canceller(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Launch `payload <target> <duration_secs> <args...>`.
///
/// `on_exit` runs once the child has been reaped, before `Completed` is
/// delivered.
pub fn spawn_payload<F>(
    payload: &Path,
    task_id: &TaskId,
    task: &TaskSpec,
    kill_grace: Duration,
    log: TaskLog,
    on_exit: F,
) -> std::io::Result<TaskRun>
where
    F: FnOnce() + Send + 'static,
{
    let mut cmd = Command::new(payload);
    cmd.arg(&task.target)
        .arg(task.duration_secs.to_string())
        .args(&task.args)
        .env(TASK_ID_ENV, task_id.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    let pid = child.id();
    let output = Output {
        stdout: child.stdout.take().map(|s| BufReader::new(s).split(b'\n')),
        stderr: child.stderr.take().map(|s| BufReader::new(s).split(b'\n')),
    };
    tracing::info!(%task_id, pid, payload = %payload.display(), "payload started");

    let (tx, events) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();
    let supervisor = Supervisor {
        task_id: task_id.clone(),
        pid,
        kill_grace,
        log,
        events: tx,
        cancel: cancel.clone(),
    };
    tokio::spawn(supervisor.run(child, output, on_exit));

    Ok(TaskRun { task_id: task_id.clone(), pid, events, cancel })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Stdout,
    Stderr,
}

/// The child's two output streams, read as lines until both close.
///
/// Lines are split on raw bytes so invalid UTF-8 is decoded lossily instead
/// of ending the stream.
struct Output {
    stdout: Option<Split<BufReader<ChildStdout>>>,
    stderr: Option<Split<BufReader<ChildStderr>>>,
}

impl Output {
    fn is_done(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }

    /// Next line from either stream, or `None` once both are closed.
    async fn next(&mut self) -> Option<(Source, String)> {
        while !self.is_done() {
            let (source, line) = tokio::select! {
                line = next_line(&mut self.stdout) => (Source::Stdout, line),
                line = next_line(&mut self.stderr) => (Source::Stderr, line),
            };
            match (source, line) {
                (source, Some(line)) => return Some((source, line)),
                (Source::Stdout, None) => self.stdout = None,
                (Source::Stderr, None) => self.stderr = None,
            }
        }
        None
    }
}

async fn next_line<R>(segments: &mut Option<Split<R>>) -> Option<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let Some(segments) = segments else {
        return std::future::pending().await;
    };
    match segments.next_segment().await {
        Ok(Some(bytes)) => Some(decode_line(&bytes)),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "payload output read failed");
            None
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

struct Supervisor {
    task_id: TaskId,
    pid: Option<u32>,
    kill_grace: Duration,
    log: TaskLog,
    events: mpsc::Sender<ProgressEvent>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run<F: FnOnce()>(mut self, mut child: Child, mut output: Output, on_exit: F) {
        let cancel = self.cancel.clone();
        let mut stopping = false;
        let mut kill_at: Option<Instant> = None;

        let status = loop {
            tokio::select! {
                next = output.next(), if !output.is_done() => {
                    if let Some((source, line)) = next {
                        self.handle_line(source, line).await;
                    }
                }
                status = child.wait() => break status,
                _ = cancel.cancelled(), if !stopping => {
                    stopping = true;
                    tracing::info!(task_id = %self.task_id, "stopping payload");
                    self.log.line("agent", "cancel requested, sending SIGTERM");
                    self.signal(Signal::SIGTERM);
                    kill_at = Some(Instant::now() + self.kill_grace);
                }
                _ = sleep_until(kill_at), if kill_at.is_some() => {
                    tracing::warn!(task_id = %self.task_id, "payload ignored SIGTERM, killing");
                    self.signal(Signal::SIGKILL);
                    kill_at = None;
                }
            }
        };

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while let Some((source, line)) = output.next().await {
                self.handle_line(source, line).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::debug!(task_id = %self.task_id, "payload output still open after exit");
        }

        let exit_code = self.exit_code(status);
        on_exit();
        let _ = self.events.send(ProgressEvent::Completed { exit_code }).await;
    }

    async fn handle_line(&mut self, source: Source, line: String) {
        match (source, parse_progress(&line)) {
            (Source::Stdout, Some(message)) => {
                let event = ProgressEvent::Progress { message: message.to_string() };
                self.log.line("progress", message);
                // A vanished consumer must not stop the payload
                let _ = self.events.send(event).await;
            }
            (Source::Stdout, None) => {
                tracing::debug!(task_id = %self.task_id, "stdout: {}", line);
                self.log.line("stdout", &line);
            }
            (Source::Stderr, _) => {
                tracing::debug!(task_id = %self.task_id, "stderr: {}", line);
                self.log.line("stderr", &line);
            }
        }
    }

    fn signal(&self, signal: Signal) {
        let Some(pid) = self.pid.and_then(|p| i32::try_from(p).ok()) else {
            return;
        };
        if let Err(e) = kill(Pid::from_raw(pid), signal) {
            tracing::debug!(task_id = %self.task_id, ?signal, error = %e, "signal failed");
        }
    }

    fn exit_code(&mut self, status: std::io::Result<ExitStatus>) -> Option<i32> {
        match status {
            Ok(status) => {
                let code = status.code();
                tracing::info!(task_id = %self.task_id, ?code, "payload exited");
                match code {
                    Some(code) => self.log.line("agent", &format!("exited with code {code}")),
                    None => self.log.line("agent", "terminated by signal"),
                }
                code
            }
            Err(e) => {
                tracing::error!(task_id = %self.task_id, error = %e, "failed to wait for payload");
                self.log.line("agent", &format!("wait failed: {e}"));
                None
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
