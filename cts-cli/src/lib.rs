// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for the CTS test-query execution engine.
//!
//! The `cts` binary runs the demo catalog from `cts-fixtures`. Hosts with their own catalog parse
//! a [`CtsApp`] and pass the catalog to [`CtsApp::exec`].

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
