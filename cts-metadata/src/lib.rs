// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Machine-readable output and exit codes for the CTS runner.
//!
//! The types in this crate are stable serialization formats: the runner produces them and
//! external tools consume them as JSON.

mod exit_codes;
mod results;
mod test_list;

pub use exit_codes::*;
pub use results::*;
pub use test_list::*;
