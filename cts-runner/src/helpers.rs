// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for cts-runner.

use std::any::Any;

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "case" if `count` is 1, otherwise "cases".
    pub fn cases_str(count: usize) -> &'static str {
        if count == 1 { "case" } else { "cases" }
    }

    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "(non-string payload)".to_owned()
    }
}
