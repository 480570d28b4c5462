// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token comparison for the `Hello` handshake.

use subtle::ConstantTimeEq;

/// Compare a presented token against the expected one in constant time.
///
/// Only the length of the expected token can leak through timing.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
