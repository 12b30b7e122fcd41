// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture information.

use cts_metadata::{RunSummary, Status, TestResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CaseFixture {
    pub name: &'static str,
    pub status: Status,
}

impl CaseFixture {
    pub const fn new(name: &'static str, status: Status) -> Self {
        Self { name, status }
    }
}

// Lets a Vec of CaseFixture be compared directly with run results.
impl PartialEq<TestResult> for CaseFixture {
    fn eq(&self, result: &TestResult) -> bool {
        self.name == result.name && self.status == result.status
    }
}

/// Returns the summary counts a run over `fixtures` should produce, ignoring time.
pub fn expected_summary<'a>(fixtures: impl IntoIterator<Item = &'a CaseFixture>) -> RunSummary {
    let fixtures: Vec<_> = fixtures.into_iter().collect();
    let mut summary = RunSummary::new(fixtures.len());
    for fixture in fixtures {
        summary.record(fixture.status);
    }
    summary
}
