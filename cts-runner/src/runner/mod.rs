// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`CtsRunner`], which runs the cases a query resolves to,
//! one at a time, with cooperative cancellation.

mod case;
mod imp;

pub use case::{CaseContext, CaseError, run_case};
pub use imp::*;
