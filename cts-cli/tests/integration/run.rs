// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{cts, cts_in};
use cts_fixtures::{catalog::expected_cases, models::expected_summary};
use cts_metadata::{CtsExitCode, RunOutput, RunSummary, Status};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[test]
fn run_demo_outcomes() {
    let output = cts(&["run", "demo:*", "--message-format", "json"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::TEST_RUN_FAILED), "{output}");

    let run = RunOutput::parse_json(&output.stdout).expect("valid JSON");
    let expected = expected_cases("demo:");
    assert_eq!(expected, run.results);
    assert_eq!(
        RunSummary {
            timems: 0.0,
            ..run.summary
        },
        expected_summary(&expected)
    );
    assert!(output.stderr.contains("Summary"), "{output}");
    assert!(output.stderr.contains("error: test run failed"), "{output}");
}

#[test]
fn run_passing_query() {
    let output = cts(&["run", "suite1:foo:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::OK), "{output}");
    assert!(output.stderr.contains("3 cases run: 3 passed"), "{output}");
}

#[test]
fn run_nothing() {
    let output = cts(&["run", "suite1:nope:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::NO_TESTS_RUN), "{output}");
    assert!(output.stderr.contains("no tests to run"), "{output}");
}

#[test]
fn config_profile_applies() {
    let dir = camino_tempfile::tempdir().expect("temp dir created");
    std::fs::create_dir(dir.path().join(".config")).expect("config dir created");
    std::fs::write(
        dir.path().join(".config/cts.toml"),
        indoc! {r#"
            [profile.known-failures]
            debug = true
            status-level = "none"

            [[profile.known-failures.expectations]]
            query = "s:g:t:x=2"
            expected = "fail"
        "#},
    )
    .expect("config written");

    // The default profile doesn't know about the failure.
    let output = cts_in(dir.path(), &["run", "s:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::TEST_RUN_FAILED), "{output}");

    let output = cts_in(
        dir.path(),
        &["run", "-P", "known-failures", "s:*", "--message-format", "json"],
    );
    assert_eq!(output.exit_code, Some(CtsExitCode::OK), "{output}");
    assert_eq!(output.stderr, "");
    let run = RunOutput::parse_json(&output.stdout).expect("valid JSON");
    assert_eq!(run.results[1].status, Status::Fail);
    assert_eq!(run.results[1].expected, Some(Status::Fail));

    let output = cts_in(dir.path(), &["run", "-P", "missing", "s:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::SETUP_ERROR), "{output}");
    assert!(
        output.stderr.contains("profile `missing` not found"),
        "{output}"
    );
}

#[test]
fn invalid_config_is_a_setup_error() {
    let dir = camino_tempfile::tempdir().expect("temp dir created");
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[profile.default]\nfail-fast = \"sometimes\"\n").expect("written");

    let output = cts(&["run", "--config-file", config.as_str(), "s:*"]);
    assert_eq!(output.exit_code, Some(CtsExitCode::SETUP_ERROR), "{output}");
    assert!(output.stderr.contains("failed to parse cts config"), "{output}");
}
