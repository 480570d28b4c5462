// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for tests that launch payload scripts.
//!
//! Tests using these must be `#[serial]`: writing an executable while another
//! thread forks can make the exec fail with ETXTBSY.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_core::ProgressEvent;

use crate::executor::TaskRun;

/// Write an executable `/bin/sh` payload into `dir`.
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("payload.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Drain a run to completion, failing the test if it takes too long.
pub async fn collect(run: &mut TaskRun) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(10), run.next_event())
            .await
            .expect("payload did not finish in time");
        match next {
            Some(event) => events.push(event),
            None => return events,
        }
    }
}
