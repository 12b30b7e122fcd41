// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The final status of a test case.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The case passed.
    Pass,
    /// The case failed: an expectation or validation failed, or the body errored or panicked.
    Fail,
    /// The case was skipped, either by the body or because the run was cancelled.
    Skip,
    /// The case passed, but recorded warnings.
    Warn,
}

impl Status {
    /// Returns the lowercase name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Warn => "warn",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            "warn" => Ok(Self::Warn),
            _ => Err(StatusParseError {
                input: s.to_owned(),
            }),
        }
    }
}

/// An error returned while parsing a [`Status`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusParseError {
    /// The input that failed to parse.
    pub input: String,
}

impl fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized status `{}` (expected one of: pass, fail, skip, warn)",
            self.input
        )
    }
}

impl std::error::Error for StatusParseError {}

/// The kind of a log entry recorded while running a case.
///
/// Kinds are ordered by severity, except that `Debug` and `Info` share the lowest one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    /// Debug output, only recorded when debugging is enabled.
    Debug,
    /// Informational output.
    Info,
    /// The case (or a subcase) was skipped.
    Skip,
    /// A warning.
    Warn,
    /// An expectation failed.
    ExpectationFailed,
    /// A validation error was reported by the device.
    ValidationFailed,
    /// The body returned an error or panicked.
    Exception,
}

impl LogKind {
    /// Returns the label printed in front of log messages of this kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Skip => "SKIP",
            Self::Warn => "WARN",
            Self::ExpectationFailed => "EXPECTATION FAILED",
            Self::ValidationFailed => "VALIDATION FAILED",
            Self::Exception => "EXCEPTION",
        }
    }
}

/// A single log entry recorded while running a case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The kind of entry.
    pub kind: LogKind,

    /// The first line of the message.
    pub message: String,

    /// Extra detail: the chain of error sources, or a panic location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// If set, `detail` is not shown. The string is the reason (possibly empty).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_hidden: Option<String>,
}

impl LogEntry {
    /// Creates a new entry without detail.
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            detail_hidden: None,
        }
    }

    /// Attaches detail to this entry.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Returns the detail, if it exists and isn't hidden.
    pub fn shown_detail(&self) -> Option<&str> {
        match &self.detail_hidden {
            Some(_) => None,
            None => self.detail.as_deref(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        match (&self.detail, &self.detail_hidden) {
            (Some(detail), None) => write!(f, "\n{detail}"),
            (Some(_), Some(reason)) if !reason.is_empty() => {
                write!(f, " (detail hidden: {reason})")
            }
            _ => Ok(()),
        }
    }
}

/// The result of running a single case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// The canonical single-case query of the case.
    pub name: String,

    /// The final status.
    pub status: Status,

    /// Time taken in milliseconds, rounded up to the next microsecond.
    pub timems: f64,

    /// Log entries recorded during the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntry>,

    /// The expected status, if an expectation matched this case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Status>,
}

impl TestResult {
    /// Creates a result for a case that was never run.
    pub fn not_run(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Skip,
            timems: 0.0,
            logs: Vec::new(),
            expected: None,
        }
    }

    /// Returns true if an expectation matched this case and the status is what it expected.
    pub fn is_anticipated(&self) -> bool {
        self.expected == Some(self.status)
    }

    /// Returns true if the case was expected to fail but didn't.
    pub fn is_unexpected_pass(&self) -> bool {
        self.expected == Some(Status::Fail) && matches!(self.status, Status::Pass | Status::Warn)
    }

    /// Returns true if the case failed and no expectation anticipated it.
    pub fn is_unanticipated_failure(&self) -> bool {
        self.status == Status::Fail && !self.is_anticipated()
    }
}

/// Counts for a run.
///
/// `passed + failed + skipped + warned == total` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The number of cases the query resolved to.
    pub total: usize,
    /// The number of cases that passed.
    pub passed: usize,
    /// The number of cases that failed.
    pub failed: usize,
    /// The number of cases that were skipped (including cases not run due to cancellation).
    pub skipped: usize,
    /// The number of cases that passed with warnings.
    pub warned: usize,
    /// Wall-clock time of the run in milliseconds.
    pub timems: f64,
}

impl RunSummary {
    /// Creates a summary for `total` cases, none of them recorded yet.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Counts one result.
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Skip => self.skipped += 1,
            Status::Warn => self.warned += 1,
        }
    }

    /// Returns the number of results counted so far.
    pub fn recorded(&self) -> usize {
        self.passed + self.failed + self.skipped + self.warned
    }
}

/// The complete output of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Aggregate counts.
    pub summary: RunSummary,
    /// Per-case results, in execution order.
    pub results: Vec<TestResult>,
}

impl RunOutput {
    /// Parses JSON output produced by `cts run --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Returns true if any case failed without an expectation anticipating it.
    pub fn has_unanticipated_failures(&self) -> bool {
        self.results.iter().any(TestResult::is_unanticipated_failure)
    }
}
