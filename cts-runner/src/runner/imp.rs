// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::case::run_case;
use crate::{
    catalog::Catalog,
    errors::{RunTestsError, TestRunnerBuildError},
    expectations::Expectation,
    host::HostConfig,
    list::{TestList, load_cases},
    reporter::CancelReason,
    signal::SignalHandlerKind,
    time::stopwatch,
};
use cts_metadata::{RunOutput, RunSummary, TestResult};
use cts_query::TestQuery;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Progress callbacks for a run.
///
/// Every method has a no-op default. Calls are strictly ordered: a case's start precedes its
/// execution, and its completion precedes the next case's start.
pub trait RunCallbacks {
    /// Called immediately before a case runs.
    fn on_test_start(&mut self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called after a case has finished, with its result.
    fn on_test_complete(&mut self, result: &TestResult, index: usize, total: usize) {
        let _ = (result, index, total);
    }

    /// Called once when the run is cancelled, with the number of cases that won't run.
    fn on_run_cancel(&mut self, reason: CancelReason, remaining: usize) {
        let _ = (reason, remaining);
    }

    /// Called after the run, including the cases skipped due to cancellation.
    fn on_run_complete(&mut self, summary: &RunSummary, results: &[TestResult]) {
        let _ = (summary, results);
    }

    /// Polled before each case. Returning true cancels the rest of the run.
    fn should_stop(&self) -> bool {
        false
    }
}

impl RunCallbacks for () {}

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    fail_fast: bool,
    host: Option<HostConfig>,
}

impl TestRunnerBuilder {
    /// Sets whether the run is cancelled after the first unanticipated failure.
    pub fn set_fail_fast(&mut self, fail_fast: bool) -> &mut Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets the host configuration passed to every case.
    pub fn set_host(&mut self, host: HostConfig) -> &mut Self {
        self.host = Some(host);
        self
    }

    /// Creates a new test runner for `catalog`.
    pub fn build<'a>(
        &self,
        catalog: &'a Catalog,
        signal_handler: SignalHandlerKind,
    ) -> Result<CtsRunner<'a>, TestRunnerBuildError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("cts-runner-worker")
            .build()
            .map_err(TestRunnerBuildError::TokioRuntimeCreate)?;
        let _guard = runtime.enter();

        // signal_handler.build() must be called from within the guard.
        let mut signal_handler = signal_handler.build()?;
        let stop_handle = StopHandle::new();
        if !signal_handler.is_noop() {
            let stop_handle = stop_handle.clone();
            runtime.spawn(async move {
                while let Some(event) = signal_handler.recv().await {
                    info!(
                        "received {}, stopping after the current case",
                        event.as_str()
                    );
                    stop_handle.request(CancelReason::Signal);
                }
            });
        }

        Ok(CtsRunner {
            catalog,
            host: self.host.clone().unwrap_or_default(),
            fail_fast: self.fail_fast,
            stop_handle,
            runtime,
            last_run: None,
        })
    }
}

/// A cloneable handle used to stop a run from outside the run loop.
///
/// Stopping is cooperative: the case in flight always finishes, and the run loop checks the
/// handle before starting the next one.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    reason: Arc<AtomicU8>,
}

impl StopHandle {
    const NONE: u8 = 0;

    /// Creates a new handle with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop before the next case.
    pub fn request_stop(&self) {
        self.request(CancelReason::StopRequested);
    }

    /// Returns true if a stop was requested, either directly or through a signal.
    pub fn is_stop_requested(&self) -> bool {
        self.reason().is_some()
    }

    /// Clears any stop request.
    pub fn reset(&self) {
        self.reason.store(Self::NONE, Ordering::SeqCst);
    }

    /// Returns the most severe reason a stop was requested for.
    pub fn reason(&self) -> Option<CancelReason> {
        match self.reason.load(Ordering::SeqCst) {
            1 => Some(CancelReason::TestFailure),
            2 => Some(CancelReason::StopRequested),
            3 => Some(CancelReason::Signal),
            _ => None,
        }
    }

    pub(crate) fn request(&self, reason: CancelReason) {
        let value = match reason {
            CancelReason::TestFailure => 1,
            CancelReason::StopRequested => 2,
            CancelReason::Signal => 3,
        };
        self.reason.fetch_max(value, Ordering::SeqCst);
    }
}

/// Context for running cases against a catalog.
///
/// Created using [`TestRunnerBuilder::build`]. Runs take `&mut self`, so a runner executes at
/// most one run at a time.
#[derive(Debug)]
pub struct CtsRunner<'a> {
    catalog: &'a Catalog,
    host: HostConfig,
    fail_fast: bool,
    stop_handle: StopHandle,
    runtime: Runtime,
    last_run: Option<RunOutput>,
}

impl<'a> CtsRunner<'a> {
    /// Returns the catalog this runner resolves queries against.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Returns the canonical names of the cases `query_str` resolves to, in run order.
    pub fn list_tests(&self, query_str: &str) -> Result<Vec<String>, RunTestsError> {
        list_tests(self.catalog, query_str)
    }

    /// Runs every case `query_str` resolves to.
    ///
    /// Outcomes of individual cases never turn into errors. Only a query that doesn't parse or a
    /// catalog whose params can't be generated fails the run.
    pub fn run_tests(
        &mut self,
        query_str: &str,
        callbacks: &mut dyn RunCallbacks,
        expectations: &[Expectation],
    ) -> Result<RunOutput, RunTestsError> {
        let query = TestQuery::parse(query_str)?;
        let list = load_cases(self.catalog, &query)?;
        Ok(self.execute(&list, callbacks, expectations))
    }

    /// Runs the first case `name` resolves to and returns its result.
    pub fn run_single_test(
        &mut self,
        name: &str,
        expectations: &[Expectation],
    ) -> Result<TestResult, RunTestsError> {
        let query = TestQuery::parse(name)?;
        let list = load_cases(self.catalog, &query)?;
        let Some(leaf) = list.first() else {
            return Err(RunTestsError::NotFound {
                name: name.to_owned(),
            });
        };

        self.stop_handle.reset();
        self.last_run = None;
        let stopwatch = stopwatch();
        debug!(%name, start_time = %stopwatch.start_time(), "running single case");
        let result = self
            .runtime
            .block_on(run_case(leaf, expectations, &self.host));

        let mut summary = RunSummary::new(1);
        summary.record(result.status);
        summary.timems = stopwatch.snapshot().timems();
        self.last_run = Some(RunOutput {
            summary,
            results: vec![result.clone()],
        });
        Ok(result)
    }

    /// Requests that the current run stop before its next case.
    pub fn request_stop(&self) {
        self.stop_handle.request_stop();
    }

    /// Returns true if a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_handle.is_stop_requested()
    }

    /// Clears any stop request. Runs do this when they start.
    pub fn reset_stop(&self) {
        self.stop_handle.reset();
    }

    /// Returns a handle that can stop runs from another thread or from a callback.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Returns the output of the most recent run, if any.
    pub fn last_run(&self) -> Option<&RunOutput> {
        self.last_run.as_ref()
    }

    /// Serializes the results of the most recent run as a JSON array.
    pub fn results_json(&self, pretty: bool) -> serde_json::Result<String> {
        let results = self
            .last_run
            .as_ref()
            .map_or(&[][..], |output| &output.results[..]);
        if pretty {
            serde_json::to_string_pretty(results)
        } else {
            serde_json::to_string(results)
        }
    }

    fn execute(
        &mut self,
        list: &TestList<'_>,
        callbacks: &mut dyn RunCallbacks,
        expectations: &[Expectation],
    ) -> RunOutput {
        self.stop_handle.reset();
        self.last_run = None;

        let total = list.len();
        let stopwatch = stopwatch();
        debug!(
            query = %list.query(),
            total,
            start_time = %stopwatch.start_time(),
            "starting run"
        );

        let mut summary = RunSummary::new(total);
        let mut results: Vec<TestResult> = Vec::with_capacity(total);
        let mut cancelled = None;

        for (index, leaf) in list.iter().enumerate() {
            if cancelled.is_none() {
                cancelled = self.poll_cancel(&*callbacks, results.last());
                if let Some(reason) = cancelled {
                    let remaining = total - index;
                    debug!("canceling due to {reason}: {remaining} still to run");
                    callbacks.on_run_cancel(reason, remaining);
                }
            }

            let result = if cancelled.is_some() {
                TestResult::not_run(leaf.name())
            } else {
                let name = leaf.name();
                callbacks.on_test_start(&name, index, total);
                let result = self
                    .runtime
                    .block_on(run_case(leaf, expectations, &self.host));
                debug!(%name, status = %result.status, timems = result.timems, "case finished");
                callbacks.on_test_complete(&result, index, total);
                result
            };
            summary.record(result.status);
            results.push(result);
        }

        let snapshot = stopwatch.snapshot();
        summary.timems = snapshot.timems();
        debug!(
            end_time = %snapshot.end_time(),
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            warned = summary.warned,
            "run finished"
        );
        callbacks.on_run_complete(&summary, &results);

        let output = RunOutput { summary, results };
        self.last_run = Some(output.clone());
        output
    }

    fn poll_cancel(
        &self,
        callbacks: &dyn RunCallbacks,
        previous: Option<&TestResult>,
    ) -> Option<CancelReason> {
        if let Some(reason) = self.stop_handle.reason() {
            return Some(reason);
        }
        if callbacks.should_stop() {
            return Some(CancelReason::StopRequested);
        }
        if self.fail_fast && previous.is_some_and(TestResult::is_unanticipated_failure) {
            return Some(CancelReason::TestFailure);
        }
        None
    }
}

/// Returns the canonical names of the cases `query_str` resolves to in `catalog`, in run order.
pub fn list_tests(catalog: &Catalog, query_str: &str) -> Result<Vec<String>, RunTestsError> {
    let query = TestQuery::parse(query_str)?;
    Ok(load_cases(catalog, &query)?.names())
}

/// Runs every case `query_str` resolves to in `catalog`, with the default host and no signal
/// handling.
pub fn run_tests(
    catalog: &Catalog,
    query_str: &str,
    callbacks: &mut dyn RunCallbacks,
    expectations: &[Expectation],
) -> Result<RunOutput, RunTestsError> {
    let mut runner = TestRunnerBuilder::default().build(catalog, SignalHandlerKind::Noop)?;
    runner.run_tests(query_str, callbacks, expectations)
}

/// Runs the first case `name` resolves to in `catalog`.
pub fn run_single_test(
    catalog: &Catalog,
    name: &str,
    expectations: &[Expectation],
) -> Result<TestResult, RunTestsError> {
    let mut runner = TestRunnerBuilder::default().build(catalog, SignalHandlerKind::Noop)?;
    runner.run_single_test(name, expectations)
}
