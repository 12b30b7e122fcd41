// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for the CTS test-query execution engine.
//!
//! The basic flow of operations is:
//! 1. Register spec files and their test groups in a [`Catalog`](catalog::Catalog).
//! 2. Resolve a query against the catalog with [`load_cases`](list::load_cases), or arrange it as
//!    a [`TestTree`](list::TestTree).
//! 3. Run the resolved cases one at a time with a [`CtsRunner`](runner::CtsRunner), reporting
//!    progress through [`RunCallbacks`](runner::RunCallbacks).

pub mod catalog;
pub mod config;
pub mod errors;
pub mod expectations;
mod helpers;
pub mod host;
pub mod list;
pub mod params;
mod recorder;
pub mod reporter;
pub mod runner;
pub mod signal;
mod time;
