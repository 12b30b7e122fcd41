// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture catalog for the CTS runner, shared by integration tests and the `cts` binary.

pub mod catalog;
pub mod models;
