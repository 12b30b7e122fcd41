// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::cts;
use cts_fixtures::catalog::EXPECTED_CASES;
use cts_metadata::{CtsExitCode, TestListSummary};
use pretty_assertions::assert_eq;

#[test]
fn list_json_covers_the_catalog() {
    let output = cts(&["list", "--message-format", "json-pretty"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::OK), "{output}");

    let summary = TestListSummary::parse_json(&output.stdout).expect("valid JSON");
    assert_eq!(summary.case_count, EXPECTED_CASES.len());
    let mut listed: Vec<_> = summary.cases.iter().map(|case| case.name.as_str()).collect();
    let mut expected: Vec<_> = EXPECTED_CASES.iter().map(|case| case.name).collect();
    listed.sort_unstable();
    expected.sort_unstable();
    assert_eq!(listed, expected);
}

#[test]
fn list_verbose_shows_descriptions() {
    let output = cts(&["list", "-v", "s:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::OK), "{output}");
    assert_eq!(
        output.stdout,
        "s:g:t:x=1;\n    Passes for x=1 and fails for x=2.\n\
         s:g:t:x=2;\n    Passes for x=1 and fails for x=2.\n"
    );
}

#[test]
fn invalid_query_shows_diagnostic() {
    let output = cts(&["list", "demo:api,outcomes:p*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::INVALID_QUERY), "{output}");
    assert_eq!(output.stdout, "");
    assert!(output.stderr.contains("misplaced wildcard"), "{output}");
}

#[test]
fn help_lists_subcommands() {
    let output = cts(&["--help"]);
    assert_eq!(output.exit_code, Some(0), "{output}");
    assert!(output.stdout.contains("list"), "{output}");
    assert!(output.stdout.contains("run"), "{output}");
}
