// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording log entries and the final status of a single case.

use crate::runner::CaseError;
use cts_metadata::{LogEntry, LogKind, Status};
use cts_query::CaseParams;
use std::fmt::Write as _;
use tracing::debug;

/// How bad a log entry is. The final status of a case is the worst severity recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LogSeverity {
    Pass,
    Skip,
    Warn,
    ExpectFailed,
    ValidationFailed,
    ThrewException,
}

impl LogSeverity {
    pub(crate) fn to_status(self) -> Status {
        match self {
            Self::Pass => Status::Pass,
            Self::Skip => Status::Skip,
            Self::Warn => Status::Warn,
            Self::ExpectFailed | Self::ValidationFailed | Self::ThrewException => Status::Fail,
        }
    }
}

const MAX_LOG_DETAILS: usize = 2;
const MIN_SEVERITY_FOR_DETAIL: LogSeverity = LogSeverity::Warn;

/// Records the logs of one case, including any subcases.
#[derive(Debug)]
pub(crate) struct CaseRecorder {
    debugging: bool,
    main: LogBuffer,
    subcase: Option<LogBuffer>,
    finished: bool,
}

impl CaseRecorder {
    pub(crate) fn new(debugging: bool) -> Self {
        Self {
            debugging,
            main: LogBuffer::default(),
            subcase: None,
            finished: false,
        }
    }

    pub(crate) fn is_debugging(&self) -> bool {
        self.debugging
    }

    pub(crate) fn debug(&mut self, message: impl Into<String>) {
        if self.debugging {
            self.log(LogSeverity::Pass, LogKind::Debug, message.into(), None);
        }
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.log(LogSeverity::Pass, LogKind::Info, message.into(), None);
    }

    pub(crate) fn skipped(&mut self, reason: impl Into<String>) {
        self.log(LogSeverity::Skip, LogKind::Skip, reason.into(), None);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.log(LogSeverity::Warn, LogKind::Warn, message.into(), detail);
    }

    pub(crate) fn expectation_failed(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.log(
            LogSeverity::ExpectFailed,
            LogKind::ExpectationFailed,
            message.into(),
            detail,
        );
    }

    pub(crate) fn validation_failed(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.log(
            LogSeverity::ValidationFailed,
            LogKind::ValidationFailed,
            message.into(),
            detail,
        );
    }

    /// Records the error a body (or an eventual expectation) ended with.
    pub(crate) fn threw(&mut self, error: CaseError) {
        match error {
            CaseError::Skip { reason } => self.skipped(reason),
            CaseError::Failure { message, source } => {
                let detail = source.map(|source| {
                    let mut detail = String::new();
                    let mut next: Option<&(dyn std::error::Error + 'static)> = Some(&*source);
                    while let Some(error) = next {
                        if !detail.is_empty() {
                            detail.push('\n');
                        }
                        _ = write!(detail, "caused by: {error}");
                        next = error.source();
                    }
                    detail
                });
                self.log(LogSeverity::ThrewException, LogKind::Exception, message, detail);
            }
        }
    }

    /// Starts recording a subcase. Entries go to the subcase until [`Self::end_subcase`].
    pub(crate) fn begin_subcase(&mut self, params: &CaseParams) {
        self.end_subcase();
        self.info(format!("subcase: {params}"));
        self.subcase = Some(LogBuffer::default());
    }

    /// Folds the current subcase's entries and severity into the case.
    pub(crate) fn end_subcase(&mut self) {
        if let Some(subcase) = self.subcase.take() {
            self.main.severity = self.main.severity.max(subcase.severity);
            self.main.slots.push(Slot::Subcase(subcase.slots));
        }
    }

    /// Stops recording and returns the final status and the flattened log entries.
    ///
    /// Anything logged afterwards is dropped.
    pub(crate) fn finish(&mut self) -> (Status, Vec<LogEntry>) {
        self.end_subcase();
        self.finished = true;
        let mut logs = Vec::new();
        for slot in std::mem::take(&mut self.main.slots) {
            match slot {
                Slot::Entry(entry) => logs.push(entry),
                Slot::Subcase(entries) => logs.extend(entries.into_iter().filter_map(
                    |slot| match slot {
                        Slot::Entry(entry) => Some(entry),
                        Slot::Subcase(_) => None,
                    },
                )),
            }
        }
        (self.main.severity.to_status(), logs)
    }

    fn log(&mut self, severity: LogSeverity, kind: LogKind, message: String, detail: Option<String>) {
        if self.finished {
            debug!(
                "ignoring {} entry logged after the case finished: {message}",
                kind.label()
            );
            return;
        }
        let buffer = self.subcase.as_mut().unwrap_or(&mut self.main);
        buffer.push(severity, kind, message, detail);
    }
}

#[derive(Debug)]
enum Slot {
    Entry(LogEntry),
    Subcase(Vec<Slot>),
}

#[derive(Debug)]
struct LogBuffer {
    severity: LogSeverity,
    hide_below: LogSeverity,
    lines_at_current: usize,
    slots: Vec<Slot>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self {
            severity: LogSeverity::Pass,
            hide_below: MIN_SEVERITY_FOR_DETAIL,
            lines_at_current: 0,
            slots: Vec::new(),
        }
    }
}

impl LogBuffer {
    fn push(&mut self, severity: LogSeverity, kind: LogKind, message: String, detail: Option<String>) {
        self.severity = self.severity.max(severity);

        let mut entry = LogEntry::new(kind, message);
        entry.detail = detail;
        let mut hidden = None;

        if severity > self.hide_below {
            self.lines_at_current = 0;
            self.hide_below = severity;
            // Earlier entries at lower severity lose their detail. Subcases keep theirs.
            for slot in &mut self.slots {
                if let Slot::Entry(earlier) = slot {
                    if earlier.detail.is_some() {
                        earlier.detail_hidden = Some("below max severity".to_owned());
                    }
                }
            }
        }
        if severity == self.hide_below {
            self.lines_at_current += 1;
        } else if severity < MIN_SEVERITY_FOR_DETAIL {
            hidden = Some(String::new());
        } else if severity < self.hide_below {
            hidden = Some("below max severity".to_owned());
        }
        if self.lines_at_current > MAX_LOG_DETAILS {
            hidden = Some(format!("only {MAX_LOG_DETAILS} shown"));
        }

        if entry.detail.is_some() {
            entry.detail_hidden = hidden;
        }
        self.slots.push(Slot::Entry(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    fn hidden(logs: &[LogEntry]) -> Vec<Option<&str>> {
        logs.iter().map(|e| e.detail_hidden.as_deref()).collect()
    }

    #[test]
    fn status_is_worst_severity() {
        let mut rec = CaseRecorder::new(false);
        assert_eq!(rec.finish().0, Status::Pass);

        let mut rec = CaseRecorder::new(false);
        rec.info("hello");
        rec.skipped("nope");
        assert_eq!(rec.finish().0, Status::Skip);

        let mut rec = CaseRecorder::new(false);
        rec.warn("careful", None);
        rec.skipped("nope");
        assert_eq!(rec.finish().0, Status::Warn);

        let mut rec = CaseRecorder::new(false);
        rec.validation_failed("invalid", None);
        rec.warn("careful", None);
        assert_eq!(rec.finish().0, Status::Fail);
    }

    #[test]
    fn debug_only_when_debugging() {
        let mut rec = CaseRecorder::new(false);
        rec.debug("quiet");
        assert!(rec.finish().1.is_empty());

        let mut rec = CaseRecorder::new(true);
        rec.debug("loud");
        let (status, logs) = rec.finish();
        assert_eq!(status, Status::Pass);
        assert_eq!(logs, vec![LogEntry::new(LogKind::Debug, "loud")]);
    }

    #[test]
    fn detail_hiding() {
        let detail = || Some("detail".to_owned());
        let mut rec = CaseRecorder::new(false);
        rec.warn("w1", detail());
        rec.warn("w2", detail());
        rec.warn("w3", detail());
        rec.info("no detail");
        let (_, logs) = rec.finish();
        assert_eq!(hidden(&logs), vec![None, None, Some("only 2 shown"), None]);

        let mut rec = CaseRecorder::new(false);
        rec.warn("w1", detail());
        rec.expectation_failed("e1", detail());
        rec.warn("w2", detail());
        rec.expectation_failed("e2", detail());
        rec.expectation_failed("e3", detail());
        let (status, logs) = rec.finish();
        assert_eq!(status, Status::Fail);
        assert_eq!(
            hidden(&logs),
            vec![
                Some("below max severity"),
                None,
                Some("below max severity"),
                None,
                Some("only 2 shown"),
            ]
        );
    }

    #[test]
    fn threw_records_error_chain() {
        let mut rec = CaseRecorder::new(false);
        let source = io::Error::other("disk on fire");
        rec.threw(CaseError::from_error("couldn't read", source));
        rec.threw(CaseError::skip("no device"));
        let (status, logs) = rec.finish();
        assert_eq!(status, Status::Fail);
        assert_eq!(
            logs,
            vec![
                LogEntry::new(LogKind::Exception, "couldn't read")
                    .with_detail("caused by: disk on fire"),
                LogEntry::new(LogKind::Skip, "no device"),
            ]
        );
    }

    #[test]
    fn subcases_fold_into_case() {
        let mut rec = CaseRecorder::new(false);
        rec.begin_subcase(&CaseParams::new().with("a", 1));
        rec.info("first");
        rec.begin_subcase(&CaseParams::new().with("a", 2));
        rec.expectation_failed("second", None);
        rec.end_subcase();

        let (status, logs) = rec.finish();
        assert_eq!(status, Status::Fail);
        assert_eq!(
            logs,
            vec![
                LogEntry::new(LogKind::Info, "subcase: a=1;"),
                LogEntry::new(LogKind::Info, "first"),
                LogEntry::new(LogKind::Info, "subcase: a=2;"),
                LogEntry::new(LogKind::ExpectationFailed, "second"),
            ]
        );
    }

    #[test]
    fn writes_after_finish_are_ignored() {
        let mut rec = CaseRecorder::new(false);
        rec.info("before");
        let (_, logs) = rec.finish();
        assert_eq!(logs.len(), 1);

        rec.expectation_failed("late", None);
        assert_eq!(rec.finish(), (Status::Pass, Vec::new()));
    }
}
