// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `cts` failures.
///
/// `cts` runs may fail for a variety of reasons. This structure documents the exit codes that
/// may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum CtsExitCode {}

impl CtsExitCode {
    /// No errors occurred and `cts` exited normally.
    pub const OK: i32 = 0;

    /// No tests were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more tests failed without an expectation anticipating it.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Resolving the query into a list of cases produced an error.
    pub const TEST_LIST_CREATION_FAILED: i32 = 104;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a `cts` invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// A query failed to parse.
    pub const INVALID_QUERY: i32 = 94;
}
