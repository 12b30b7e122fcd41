// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the `list` and `run` commands against a catalog.

use super::cli::{ConfigOpts, ListOpts, ListType, RunOpts};
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter},
};
use cts_metadata::{CtsExitCode, RunOutput, RunSummary, Status, TestListSummary, TestResult};
use cts_query::{Ordering, TestQuery};
use cts_runner::{
    catalog::Catalog,
    errors::{CollapseError, WriteEventError, WriteTestListError},
    expectations::Expectation,
    host::HostConfig,
    list::{OutputFormat, TestList, TestTree, load_cases},
    reporter::{CancelReason, TestReporterBuilder},
    runner::{RunCallbacks, TestRunnerBuilder},
    signal::SignalHandlerKind,
};
use itertools::Itertools;
use std::io::Write;
use tracing::debug;

/// Parses `queries`, or returns a query for every suite in the catalog if there are none.
///
/// Queries covered by another query are dropped, so every case is listed or run at most once.
pub(super) fn resolve_queries(catalog: &Catalog, queries: &[String]) -> Result<Vec<TestQuery>> {
    if queries.is_empty() {
        return Ok(catalog
            .suites()
            .into_iter()
            .map(|suite| TestQuery::multi_file(suite, Vec::new()))
            .collect());
    }
    let queries = queries
        .iter()
        .map(|query| TestQuery::parse(query))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(drop_covered(queries))
}

/// Removes every query contained in another one, keeping the first of equal queries.
///
/// Queries that don't contain each other select disjoint sets of cases, so the remaining queries
/// never overlap.
fn drop_covered(queries: Vec<TestQuery>) -> Vec<TestQuery> {
    let covered: Vec<bool> = queries
        .iter()
        .enumerate()
        .map(|(i, query)| {
            queries.iter().enumerate().any(|(j, other)| {
                i != j
                    && match other.compare(query) {
                        Ordering::StrictSuperset => true,
                        Ordering::Equal => j < i,
                        _ => false,
                    }
            })
        })
        .collect();
    queries
        .into_iter()
        .zip(covered)
        .filter_map(|(query, covered)| {
            if covered {
                debug!(query = %query, "skipping query covered by another query");
                None
            } else {
                Some(query)
            }
        })
        .collect()
}

pub(super) fn exec_list(
    opts: ListOpts,
    catalog: &Catalog,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let queries = resolve_queries(catalog, &opts.queries)?;
    let format = opts.message_format.to_output_format(output.verbose);
    if opts.list_type == ListType::Tree && !matches!(format, OutputFormat::Human { .. }) {
        return Err(ExpectedError::UnsupportedMessageFormat {
            list_type: opts.list_type.to_static_str(),
        });
    }
    let colorize = output.color.should_colorize(supports_color::Stream::Stdout);

    let mut writer = output_writer.stdout_writer();
    match opts.list_type {
        ListType::Cases => {
            let lists = queries
                .iter()
                .map(|query| load_cases(catalog, query))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            match format {
                OutputFormat::Human { .. } => {
                    for list in &lists {
                        list.write(format, &mut writer, colorize)?;
                    }
                }
                OutputFormat::Serializable(format) => {
                    format
                        .to_writer(&merge_list_summaries(&lists), &mut writer)
                        .map_err(WriteTestListError::Json)?;
                    writeln!(writer).map_err(ExpectedError::write_output_error)?;
                }
                _ => unreachable!("all OutputFormat variants are handled above"),
            }
        }
        ListType::Tree => {
            for query in &queries {
                TestTree::new(catalog, query)?
                    .write_to(&mut writer, colorize)
                    .map_err(ExpectedError::write_output_error)?;
            }
        }
        ListType::Collapsed => {
            let collapsed = collapse(catalog, &queries, &opts.expectations)?;
            match format {
                OutputFormat::Human { .. } => {
                    for query in &collapsed {
                        writeln!(writer, "{query}").map_err(ExpectedError::write_output_error)?;
                    }
                }
                OutputFormat::Serializable(format) => {
                    format
                        .to_writer(&collapsed, &mut writer)
                        .map_err(WriteTestListError::Json)?;
                    writeln!(writer).map_err(ExpectedError::write_output_error)?;
                }
                _ => unreachable!("all OutputFormat variants are handled above"),
            }
        }
    }
    writer.flush().map_err(ExpectedError::write_output_error)?;

    Ok(CtsExitCode::OK)
}

/// Collapses the tree of each query in turn. Each expectation goes to the trees of its suite.
fn collapse(
    catalog: &Catalog,
    queries: &[TestQuery],
    expectations: &[String],
) -> Result<Vec<TestQuery>> {
    let expectations = expectations
        .iter()
        .map(|expectation| TestQuery::parse(expectation))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(CollapseError::Parse)?;

    let unmatched: Vec<_> = expectations
        .iter()
        .filter(|expectation| queries.iter().all(|q| q.suite() != expectation.suite()))
        .map(ToString::to_string)
        .collect();
    if !unmatched.is_empty() {
        return Err(CollapseError::Unmatched { queries: unmatched }.into());
    }

    let mut collapsed = Vec::new();
    for query in queries {
        let tree = TestTree::new(catalog, query)?;
        let in_suite = expectations
            .iter()
            .filter(|expectation| expectation.suite() == query.suite())
            .map(ToString::to_string);
        collapsed.extend(tree.iterate_collapsed(in_suite)?);
    }
    Ok(collapsed)
}

fn merge_list_summaries(lists: &[TestList<'_>]) -> TestListSummary {
    let mut merged = TestListSummary {
        query: lists.iter().map(|list| list.query()).join(" "),
        ..Default::default()
    };
    for list in lists {
        let summary = list.to_summary();
        merged.case_count += summary.case_count;
        merged.cases.extend(summary.cases);
    }
    merged
}

pub(super) fn exec_run(
    opts: RunOpts,
    config_opts: &ConfigOpts,
    catalog: &Catalog,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let queries = resolve_queries(catalog, &opts.queries)?;
    let config = config_opts.make_config()?;
    let profile = config_opts.load_profile(&config)?;

    let mut expectations = profile.expectations().to_vec();
    for path in &opts.expectations_files {
        expectations.extend(Expectation::from_file(path)?);
    }
    debug!(
        profile = profile.name(),
        expectation_count = expectations.len(),
        "loaded expectations"
    );

    let fail_fast = opts.reporter_opts.fail_fast(&profile);
    let mut runner = TestRunnerBuilder::default()
        .set_fail_fast(fail_fast)
        .set_host(HostConfig::from_profile(&profile))
        .build(catalog, SignalHandlerKind::Standard)?;

    let mut run_output = RunOutput::default();
    let mut reporter_builder = TestReporterBuilder::default();
    reporter_builder
        .set_status_level(opts.reporter_opts.status_level(&profile))
        .set_verbose(output.verbose);
    let mut reporter = reporter_builder.build(output_writer.stderr_writer());
    if output.color.should_colorize(supports_color::Stream::Stderr) {
        reporter.colorize();
    }

    let mut remaining = queries.iter();
    for query in remaining.by_ref() {
        let query_output = runner.run_tests(&query.to_string(), &mut reporter, &expectations)?;
        merge_run_output(&mut run_output, query_output);
        if runner.is_stop_requested()
            || reporter.should_stop()
            || (fail_fast && run_output.has_unanticipated_failures())
        {
            break;
        }
    }
    // Queries after a cancellation are reported as not run.
    for query in remaining {
        let list = load_cases(catalog, query)?;
        debug!(query = %query, case_count = list.len(), "not running query after cancellation");
        run_output.summary.total += list.len();
        for name in list.names() {
            run_output.summary.record(Status::Skip);
            run_output.results.push(TestResult::not_run(name));
        }
    }
    reporter.finish()?;
    let interrupted = matches!(runner.stop_handle().reason(), Some(CancelReason::Signal));

    if let OutputFormat::Serializable(format) =
        opts.message_format.to_output_format(output.verbose)
    {
        let mut writer = output_writer.stdout_writer();
        format
            .to_writer(&run_output, &mut writer)
            .map_err(WriteEventError::Json)?;
        writeln!(writer).map_err(ExpectedError::write_output_error)?;
        writer.flush().map_err(ExpectedError::write_output_error)?;
    }

    if run_output.summary.total == 0 {
        Err(ExpectedError::NoTestsRun)
    } else if interrupted || run_output.has_unanticipated_failures() {
        Err(ExpectedError::TestRunFailed)
    } else {
        Ok(CtsExitCode::OK)
    }
}

fn merge_run_output(merged: &mut RunOutput, output: RunOutput) {
    let RunSummary {
        total,
        passed,
        failed,
        skipped,
        warned,
        timems,
    } = output.summary;
    merged.summary.total += total;
    merged.summary.passed += passed;
    merged.summary.failed += failed;
    merged.summary.skipped += skipped;
    merged.summary.warned += warned;
    merged.summary.timems += timems;
    merged.results.extend(output.results);
}
