// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress markers in payload output.
//!
//! A payload reports progress by printing `Status: [<content>]` somewhere on
//! a stdout line. Only the bracketed content is relayed.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static STATUS_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Status: \[([^\]]+)\]").expect("constant regex pattern is valid")
});

/// Extract the progress message from one output line, if it carries one.
pub fn parse_progress(line: &str) -> Option<&str> {
    STATUS_MARKER.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
