// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod app;
mod cli;
mod execution;

pub use app::CtsApp;
