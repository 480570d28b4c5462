// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`]: `Display` impl mapping enum variants to string literals
//! - [`define_id!`](crate::define_id): prefixed random identifier newtype

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; tuple variants use `(..)` to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     WorkerState {
///         Ready => "ready",
///         Busy => "busy",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

#[cfg(test)]
#[path = "macros_tests.rs"]
mod tests;
