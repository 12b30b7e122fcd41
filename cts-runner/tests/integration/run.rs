// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use cts_fixtures::{catalog::expected_cases, models::expected_summary};
use cts_metadata::{LogKind, RunSummary, Status};
use cts_runner::{
    errors::RunTestsError,
    expectations::Expectation,
    host::{AdapterInfo, AdapterOptions, DeviceRequestError, GpuProvider, HostConfig},
    reporter::{StatusLevel, TestReporterBuilder},
    runner::{RunCallbacks, TestRunnerBuilder, run_single_test, run_tests},
    signal::SignalHandlerKind,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn two_case_scenario() -> Result<()> {
    test_init();
    let output = run_tests(&CATALOG, "s:g:t:", &mut (), &[])?;
    assert_eq!(names(&output.results), vec!["s:g:t:x=1;", "s:g:t:x=2;"]);
    assert_eq!(
        without_time(output.summary),
        RunSummary {
            total: 2,
            passed: 1,
            failed: 1,
            skipped: 0,
            warned: 0,
            timems: 0.0,
        }
    );
    assert!(output.summary.timems >= 0.0);
    assert!(output.has_unanticipated_failures());
    Ok(())
}

#[test]
fn immediate_stop_skips_everything() -> Result<()> {
    struct StopNow;

    impl RunCallbacks for StopNow {
        fn on_test_start(&mut self, name: &str, _index: usize, _total: usize) {
            panic!("{name} should not have started");
        }

        fn should_stop(&self) -> bool {
            true
        }
    }

    test_init();
    let output = run_tests(&CATALOG, "s:g:t:", &mut StopNow, &[])?;
    assert_eq!(
        without_time(output.summary),
        RunSummary {
            total: 2,
            skipped: 2,
            ..RunSummary::default()
        }
    );
    assert_eq!(names(&output.results), vec!["s:g:t:x=1;", "s:g:t:x=2;"]);
    assert!(output.results.iter().all(|r| r.timems == 0.0 && r.logs.is_empty()));
    Ok(())
}

#[test]
fn demo_outcomes_match_fixtures() -> Result<()> {
    test_init();
    let output = run_tests(&CATALOG, "demo:*", &mut (), &[])?;
    let expected = expected_cases("demo:");
    assert_eq!(expected, output.results);
    assert_eq!(without_time(output.summary), expected_summary(&expected));
    assert_eq!(output.summary.recorded(), output.results.len());
    Ok(())
}

#[test]
fn every_suite_matches_fixtures() -> Result<()> {
    test_init();
    for prefix in ["suite1:", "suite2:", "s:"] {
        let output = run_tests(&CATALOG, &format!("{prefix}*"), &mut (), &[])?;
        assert_eq!(expected_cases(prefix), output.results, "results for {prefix}*");
    }
    Ok(())
}

#[test]
fn failure_logs() -> Result<()> {
    test_init();
    let result = run_single_test(&CATALOG, "demo:api,outcomes:errors:", &[])?;
    assert_eq!(result.status, Status::Fail);
    assert_eq!(result.logs.len(), 1);
    assert_eq!(result.logs[0].kind, LogKind::Exception);
    assert_eq!(
        result.logs[0].to_string(),
        "EXCEPTION: failed to read expected data\ncaused by: file is empty"
    );

    let result = run_single_test(&CATALOG, "demo:api,outcomes:panics:", &[])?;
    assert_eq!(result.logs[0].message, "panicked: reached an unreachable state");

    // Subcase logs are kept in order, with the failing subcase's detail.
    let result = run_single_test(&CATALOG, r#"demo:api,subcases:sizes:format="rgba8unorm""#, &[])?;
    let messages: Vec<_> = result.logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["subcase: size=1;", "size is too small", "subcase: size=4;"]
    );
    assert_eq!(
        result.logs[1].shown_detail(),
        Some("rgba8unorm needs at least 4 bytes")
    );
    Ok(())
}

#[test]
fn debug_logs_need_debug_host() -> Result<()> {
    test_init();
    let result = run_single_test(&CATALOG, "suite2:foof:bleh:a=1", &[])?;
    assert!(result.logs.is_empty());

    let mut host = HostConfig::default();
    host.set_debug(true);
    let mut runner = TestRunnerBuilder::default()
        .set_host(host)
        .build(&CATALOG, SignalHandlerKind::Noop)?;
    let result = runner.run_single_test("suite2:foof:bleh:a=1", &[])?;
    let kinds: Vec<_> = result.logs.iter().map(|e| (e.kind, e.message.as_str())).collect();
    assert_eq!(kinds, vec![(LogKind::Debug, "OK"), (LogKind::Debug, "OK")]);
    Ok(())
}

#[test]
fn single_test_not_found() {
    test_init();
    let err = run_single_test(&CATALOG, "suite1:foo:nope:", &[]).expect_err("nothing matches");
    assert!(matches!(err, RunTestsError::NotFound { .. }), "{err}");
}

#[test]
fn fail_fast() -> Result<()> {
    test_init();
    let mut runner = TestRunnerBuilder::default()
        .set_fail_fast(true)
        .build(&CATALOG, SignalHandlerKind::Noop)?;
    let output = runner.run_tests("demo:api,outcomes:*", &mut (), &[])?;
    let statuses: Vec<_> = output.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            Status::Pass,
            Status::Warn,
            Status::Skip,
            Status::Fail,
            Status::Skip,
            Status::Skip,
            Status::Skip,
        ]
    );
    assert_eq!(
        without_time(output.summary),
        RunSummary {
            total: 7,
            passed: 1,
            failed: 1,
            skipped: 4,
            warned: 1,
            timems: 0.0,
        }
    );
    Ok(())
}

#[test]
fn expectations_file() -> Result<()> {
    test_init();
    let dir = Utf8TempDir::new()?;
    let path = dir.path().join("expectations.toml");
    std::fs::write(
        &path,
        indoc! {r#"
            [[expectation]]
            query = "s:g:t:x=2"
            expected = "fail"

            [[expectation]]
            query = "demo:api,outcomes:panics:*"
            expected = "skip"

            [[expectation]]
            query = "demo:api,outcomes:passes:*"
            expected = "fail"
        "#},
    )?;
    let expectations = Expectation::from_file(&path)?;
    assert_eq!(expectations.len(), 3);

    let output = run_tests(&CATALOG, "s:*", &mut (), &expectations)?;
    assert!(!output.has_unanticipated_failures());
    assert_eq!(output.results[1].expected, Some(Status::Fail));
    assert!(output.results[1].is_anticipated());

    let output = run_tests(&CATALOG, "demo:api,outcomes:p*", &mut (), &expectations);
    assert!(matches!(output, Err(RunTestsError::Parse(_))));

    let passes = run_single_test(&CATALOG, "demo:api,outcomes:passes:", &expectations)?;
    assert!(passes.is_unexpected_pass());
    let panics = run_single_test(&CATALOG, "demo:api,outcomes:panics:", &expectations)?;
    assert_eq!(panics.status, Status::Skip);
    assert_eq!(panics.logs[0].message, "expected skip");
    Ok(())
}

#[derive(Debug)]
struct FallbackProvider;

impl GpuProvider for FallbackProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    fn request_adapter(
        &self,
        options: Option<&AdapterOptions>,
    ) -> Result<AdapterInfo, DeviceRequestError> {
        Ok(AdapterInfo {
            name: "software rasterizer".to_owned(),
            is_fallback: options.is_some_and(|options| options.force_fallback_adapter),
        })
    }
}

#[test]
fn host_provider_reaches_bodies() -> Result<()> {
    test_init();
    let result = run_single_test(&CATALOG, "demo:api,device:adapter:", &[])?;
    assert_eq!(result.status, Status::Skip);
    assert_eq!(result.logs[0].message, "no adapter available from `null`");

    let mut host = HostConfig::default();
    host.set_gpu_provider(Arc::new(FallbackProvider))
        .set_force_fallback_adapter(true);
    let mut runner = TestRunnerBuilder::default()
        .set_host(host)
        .build(&CATALOG, SignalHandlerKind::Noop)?;
    let result = runner.run_single_test("demo:api,device:adapter:", &[])?;
    assert_eq!(result.status, Status::Warn);
    assert_eq!(result.logs[0].message, "using adapter software rasterizer");
    Ok(())
}

/// Replaces the durations in reporter output, which vary between runs.
fn mask_durations(output: &str) -> String {
    output
        .lines()
        .map(|line| match (line.find("] "), line.find(" [")) {
            (Some(end), Some(start)) if start < end => {
                format!("{}[ duration ]{}\n", &line[..start + 1], &line[end + 1..])
            }
            _ => format!("{line}\n"),
        })
        .collect()
}

#[test]
fn reporter_output() -> Result<()> {
    test_init();
    let mut buf = Vec::new();
    let mut reporter = TestReporterBuilder::default()
        .set_status_level(StatusLevel::Pass)
        .build(&mut buf);
    run_tests(&CATALOG, "s:*", &mut reporter, &[])?;
    reporter.finish()?;

    assert_eq!(
        mask_durations(&String::from_utf8(buf)?),
        indoc! {"
                Starting 2 cases
                    PASS [ duration ] s:g:t:x=1;
                    FAIL [ duration ] s:g:t:x=2;
                EXPECTATION FAILED: x is 2
            ------------
                 Summary [ duration ] 2 cases run: 1 passed, 1 failed
        "}
    );
    Ok(())
}
