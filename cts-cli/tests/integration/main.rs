// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `cts` binary against the demo catalog.

mod fixtures;
mod list;
mod run;
