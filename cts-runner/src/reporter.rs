// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output for test runs.
//!
//! The main structure in this module is [`TestReporter`], which implements
//! [`RunCallbacks`](crate::runner::RunCallbacks).

use crate::{
    errors::{StatusLevelParseError, WriteEventError},
    helpers::plural,
    runner::RunCallbacks,
};
use cts_metadata::{RunSummary, Status, TestResult};
use owo_colors::{OwoColorize, Style};
use serde::Deserialize;
use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};
use swrite::{SWrite, swrite};

/// Status level to show in the reporter output.
///
/// Status levels are incremental: each level causes all the statuses listed above it to be output.
/// For example, [`Warn`](Self::Warn) implies [`Fail`](Self::Fail).
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum StatusLevel {
    /// No output.
    None,

    /// Only output failures and unexpected passes.
    Fail,

    /// Output cases that passed with warnings, and all variants above.
    Warn,

    /// Output passing cases and anticipated failures, and all variants above.
    Pass,

    /// Output skipped cases in addition to all variants above.
    Skip,

    /// Output cases as they start, in addition to all variants above.
    All,
}

impl StatusLevel {
    /// Returns string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["none", "fail", "warn", "pass", "skip", "all"]
    }
}

impl FromStr for StatusLevel {
    type Err = StatusLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "none" => StatusLevel::None,
            "fail" => StatusLevel::Fail,
            "warn" => StatusLevel::Warn,
            "pass" => StatusLevel::Pass,
            "skip" => StatusLevel::Skip,
            "all" => StatusLevel::All,
            other => return Err(StatusLevelParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::None => write!(f, "none"),
            StatusLevel::Fail => write!(f, "fail"),
            StatusLevel::Warn => write!(f, "warn"),
            StatusLevel::Pass => write!(f, "pass"),
            StatusLevel::Skip => write!(f, "skip"),
            StatusLevel::All => write!(f, "all"),
        }
    }
}

/// The reason a run was cancelled.
///
/// Ordered so that a more severe reason compares greater.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CancelReason {
    /// A case failed and fail-fast is on.
    TestFailure,

    /// A stop was requested through the stop handle or the callbacks.
    StopRequested,

    /// A termination signal was received.
    Signal,
}

impl CancelReason {
    /// Returns a short description of this reason.
    pub fn to_static_str(self) -> &'static str {
        match self {
            CancelReason::TestFailure => "test failure",
            CancelReason::StopRequested => "stop requested",
            CancelReason::Signal => "signal",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_static_str())
    }
}

/// Test reporter builder.
#[derive(Debug, Default)]
pub struct TestReporterBuilder {
    status_level: Option<StatusLevel>,
    verbose: bool,
}

impl TestReporterBuilder {
    /// Sets the conditions under which cases are output.
    pub fn set_status_level(&mut self, status_level: StatusLevel) -> &mut Self {
        self.status_level = Some(status_level);
        self
    }

    /// Sets whether logs are printed for every case, not just the ones that failed or warned.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Creates a new test reporter writing to `output`.
    pub fn build<'a>(&self, output: impl Write + Send + 'a) -> TestReporter<'a> {
        TestReporter {
            status_level: self.status_level.unwrap_or(StatusLevel::Pass),
            verbose: self.verbose,
            styles: Box::default(),
            output: Box::new(output),
            error: None,
        }
    }
}

/// Writes a line per case and a final summary.
///
/// Created with a [`TestReporterBuilder`]. The first write error is kept, and afterwards the
/// reporter asks the run to stop.
pub struct TestReporter<'a> {
    status_level: StatusLevel,
    verbose: bool,
    styles: Box<Styles>,
    output: Box<dyn Write + Send + 'a>,
    error: Option<WriteEventError>,
}

impl TestReporter<'_> {
    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Flushes the output and returns the first error that occurred while writing, if any.
    pub fn finish(mut self) -> Result<(), WriteEventError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.output.flush().map_err(WriteEventError::Io)
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(error) = result {
            if self.error.is_none() {
                tracing::debug!("error writing reporter output: {error}");
                self.error = Some(WriteEventError::Io(error));
            }
        }
    }

    fn write_start(&mut self, name: &str, index: usize, total: usize) -> io::Result<()> {
        if index == 0 && self.status_level > StatusLevel::None {
            writeln!(
                self.output,
                "{:>12} {} {}",
                "Starting".style(self.styles.pass),
                total.style(self.styles.count),
                plural::cases_str(total),
            )?;
        }
        if self.status_level >= StatusLevel::All {
            writeln!(
                self.output,
                "{:>12}             {}",
                "START".style(self.styles.pass),
                name
            )?;
        }
        Ok(())
    }

    fn write_result(&mut self, result: &TestResult) -> io::Result<()> {
        let (word, style, level) = status_line(result, &self.styles);
        if self.status_level < level {
            return Ok(());
        }
        write!(self.output, "{:>12} ", word.style(style))?;
        write_duration(result.timems, &mut self.output)?;
        writeln!(self.output, "{}", result.name)?;

        let show_logs = self.verbose
            || (matches!(result.status, Status::Fail | Status::Warn) && !result.is_anticipated())
            || result.is_unexpected_pass();
        if show_logs {
            for entry in &result.logs {
                for line in entry.to_string().lines() {
                    writeln!(self.output, "    {line}")?;
                }
            }
        }
        Ok(())
    }

    fn write_cancel(&mut self, reason: CancelReason, remaining: usize) -> io::Result<()> {
        writeln!(
            self.output,
            "{:>12} due to {}: {} {} still to run",
            "Canceling".style(self.styles.fail),
            reason.to_static_str().style(self.styles.fail),
            remaining.style(self.styles.count),
            plural::cases_str(remaining),
        )
    }

    fn write_summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        if self.status_level == StatusLevel::None {
            return Ok(());
        }
        let summary_style = if summary.failed > 0 {
            self.styles.fail
        } else {
            self.styles.pass
        };
        write!(
            self.output,
            "------------\n{:>12} ",
            "Summary".style(summary_style)
        )?;
        write_duration(summary.timems, &mut self.output)?;

        let mut summary_str = String::new();
        write_summary_str(summary, &self.styles, &mut summary_str);
        writeln!(
            self.output,
            "{} {} run: {summary_str}",
            summary.total.style(self.styles.count),
            plural::cases_str(summary.total),
        )
    }
}

impl fmt::Debug for TestReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestReporter")
            .field("status_level", &self.status_level)
            .field("verbose", &self.verbose)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl RunCallbacks for TestReporter<'_> {
    fn on_test_start(&mut self, name: &str, index: usize, total: usize) {
        let result = self.write_start(name, index, total);
        self.record(result);
    }

    fn on_test_complete(&mut self, result: &TestResult, _index: usize, _total: usize) {
        let written = self.write_result(result);
        self.record(written);
    }

    fn on_run_cancel(&mut self, reason: CancelReason, remaining: usize) {
        let result = self.write_cancel(reason, remaining);
        self.record(result);
    }

    fn on_run_complete(&mut self, summary: &RunSummary, _results: &[TestResult]) {
        let result = self.write_summary(summary);
        self.record(result);
    }

    fn should_stop(&self) -> bool {
        self.error.is_some()
    }
}

/// Returns the status word, its style, and the level at which it is shown.
fn status_line(result: &TestResult, styles: &Styles) -> (&'static str, Style, StatusLevel) {
    if result.is_unexpected_pass() {
        return ("XPASS", styles.fail, StatusLevel::Fail);
    }
    match result.status {
        Status::Fail if result.is_anticipated() => ("XFAIL", styles.skip, StatusLevel::Pass),
        Status::Fail => ("FAIL", styles.fail, StatusLevel::Fail),
        Status::Warn => ("WARN", styles.skip, StatusLevel::Warn),
        Status::Pass => ("PASS", styles.pass, StatusLevel::Pass),
        Status::Skip => ("SKIP", styles.skip, StatusLevel::Skip),
    }
}

fn write_duration(timems: f64, writer: &mut dyn Write) -> io::Result<()> {
    // * > means right-align.
    // * 8 is the number of characters to pad to.
    // * .3 means print three digits after the decimal point.
    write!(writer, "[{:>8.3?}s] ", timems / 1000.0)
}

fn write_summary_str(summary: &RunSummary, styles: &Styles, out: &mut String) {
    swrite!(
        out,
        "{} {}",
        summary.passed.style(styles.count),
        "passed".style(styles.pass)
    );
    for (count, word, style) in [
        (summary.failed, "failed", styles.fail),
        (summary.warned, "warned", styles.skip),
        (summary.skipped, "skipped", styles.skip),
    ] {
        if count > 0 {
            swrite!(out, ", {} {}", count.style(styles.count), word.style(style));
        }
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_metadata::{LogEntry, LogKind};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn result(name: &str, status: Status, expected: Option<Status>) -> TestResult {
        TestResult {
            name: name.to_owned(),
            status,
            timems: 1.0,
            logs: vec![LogEntry::new(LogKind::Info, format!("{name} ran"))],
            expected,
        }
    }

    fn report(status_level: StatusLevel, verbose: bool, results: &[TestResult]) -> String {
        let mut buf = Vec::new();
        let mut reporter = TestReporterBuilder::default()
            .set_status_level(status_level)
            .set_verbose(verbose)
            .build(&mut buf);

        let mut summary = RunSummary::new(results.len());
        for (index, result) in results.iter().enumerate() {
            reporter.on_test_start(&result.name, index, results.len());
            reporter.on_test_complete(result, index, results.len());
            summary.record(result.status);
            summary.timems += result.timems;
        }
        reporter.on_run_complete(&summary, results);
        assert!(!reporter.should_stop());
        reporter.finish().expect("no write errors");
        String::from_utf8(buf).expect("output is UTF-8")
    }

    #[test]
    fn default_output() {
        let results = [
            result("s:g:t:x=1;", Status::Pass, None),
            result("s:g:t:x=2;", Status::Fail, None),
            result("s:g:t:x=3;", Status::Skip, None),
        ];
        assert_eq!(
            report(StatusLevel::Pass, false, &results),
            indoc! {"
                    Starting 3 cases
                        PASS [   0.001s] s:g:t:x=1;
                        FAIL [   0.001s] s:g:t:x=2;
                    INFO: s:g:t:x=2; ran
                ------------
                     Summary [   0.003s] 3 cases run: 1 passed, 1 failed, 1 skipped
            "}
        );
    }

    #[test]
    fn expectations_in_output() {
        let results = [
            result("s:g:t:x=1;", Status::Fail, Some(Status::Fail)),
            result("s:g:t:x=2;", Status::Pass, Some(Status::Fail)),
            result("s:g:t:x=3;", Status::Warn, None),
        ];
        assert_eq!(
            report(StatusLevel::Fail, false, &results),
            indoc! {"
                    Starting 3 cases
                       XPASS [   0.001s] s:g:t:x=2;
                    INFO: s:g:t:x=2; ran
                ------------
                     Summary [   0.003s] 3 cases run: 1 passed, 1 failed, 1 warned
            "}
        );
    }

    #[test]
    fn nothing_at_level_none() {
        let results = [result("s:g:t:;", Status::Fail, None)];
        assert_eq!(report(StatusLevel::None, false, &results), "");
    }

    #[test]
    fn verbose_all() {
        let results = [result("s:g:t:;", Status::Skip, None)];
        assert_eq!(
            report(StatusLevel::All, true, &results),
            indoc! {"
                    Starting 1 case
                       START             s:g:t:;
                        SKIP [   0.001s] s:g:t:;
                    INFO: s:g:t:; ran
                ------------
                     Summary [   0.001s] 1 case run: 0 passed, 1 skipped
            "}
        );
    }

    #[test]
    fn cancel_line() {
        let mut buf = Vec::new();
        let mut reporter = TestReporterBuilder::default().build(&mut buf);
        reporter.on_run_cancel(CancelReason::Signal, 2);
        reporter.finish().expect("no write errors");
        assert_eq!(
            String::from_utf8(buf).expect("output is UTF-8"),
            "   Canceling due to signal: 2 cases still to run\n"
        );
    }

    #[test]
    fn write_errors_request_stop() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("broken pipe"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut reporter = TestReporterBuilder::default().build(FailingWriter);
        reporter.on_test_start("s:g:t:;", 0, 1);
        assert!(reporter.should_stop());
        assert!(matches!(reporter.finish(), Err(WriteEventError::Io(_))));
    }

    #[test_case("none", StatusLevel::None)]
    #[test_case("warn", StatusLevel::Warn)]
    #[test_case("all", StatusLevel::All)]
    fn parse_status_level(input: &str, expected: StatusLevel) {
        assert_eq!(input.parse::<StatusLevel>().expect("valid level"), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn parse_status_level_error() {
        let err = "loud".parse::<StatusLevel>().expect_err("invalid level");
        assert_eq!(
            err.to_string(),
            "unrecognized value for status-level: loud\n\
             (known values: none, fail, warn, pass, skip, all)"
        );
    }
}
