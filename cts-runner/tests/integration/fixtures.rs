// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use cts_metadata::{RunSummary, TestResult};
use cts_runner::catalog::Catalog;
use std::sync::{LazyLock, Once};

pub(crate) static CATALOG: LazyLock<Catalog> =
    LazyLock::new(|| cts_fixtures::catalog::catalog().expect("fixture catalog is valid"));

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        color_eyre::install().expect("color-eyre installed once");
    });
}

/// Returns `summary` with the elapsed time zeroed, for comparisons.
pub(crate) fn without_time(summary: RunSummary) -> RunSummary {
    RunSummary {
        timems: 0.0,
        ..summary
    }
}

pub(crate) fn names(results: &[TestResult]) -> Vec<&str> {
    results.iter().map(|r| r.name.as_str()).collect()
}
