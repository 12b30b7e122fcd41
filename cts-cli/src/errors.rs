// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use cts_metadata::CtsExitCode;
use cts_query::errors::QueryParseErrors;
use cts_runner::errors::*;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are mostly placeholders. Errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An error the CLI knows how to report, with an exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirNotUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("expectations file error")]
    ExpectationsFileError {
        #[from]
        err: ExpectationsFileError,
    },
    #[error("test runner build error")]
    TestRunnerBuildError {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("unsupported message format")]
    UnsupportedMessageFormat { list_type: &'static str },
    #[error("query parse error")]
    QueryParseError { errors: QueryParseErrors },
    #[error("case generation error")]
    CaseGenerationError { err: CaseGenerationError },
    #[error("collapse error")]
    CollapseError { err: CollapseError },
    #[error("test not found")]
    TestNotFound { name: String },
    #[error("write output error")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("write test list error")]
    WriteTestListError {
        #[from]
        err: WriteTestListError,
    },
    #[error("write event error")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("run error")]
    RunError { err: RunTestsError },
    #[error("test run failed")]
    TestRunFailed,
    #[error("no tests to run")]
    NoTestsRun,
}

impl ExpectedError {
    pub(crate) fn current_dir_invalid(err: std::io::Error) -> Self {
        Self::CurrentDirInvalid { err }
    }

    pub(crate) fn current_dir_not_utf8(path: std::path::PathBuf) -> Self {
        Self::CurrentDirNotUtf8 { path }
    }

    pub(crate) fn write_output_error(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirNotUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::ExpectationsFileError { .. }
            | Self::TestRunnerBuildError { .. }
            | Self::UnsupportedMessageFormat { .. } => CtsExitCode::SETUP_ERROR,
            Self::QueryParseError { .. } => CtsExitCode::INVALID_QUERY,
            Self::CollapseError { err } => match err {
                CollapseError::Parse(_) => CtsExitCode::INVALID_QUERY,
                _ => CtsExitCode::TEST_LIST_CREATION_FAILED,
            },
            Self::CaseGenerationError { .. }
            | Self::TestNotFound { .. }
            | Self::RunError { .. } => CtsExitCode::TEST_LIST_CREATION_FAILED,
            Self::WriteOutputError { .. }
            | Self::WriteTestListError { .. }
            | Self::WriteEventError { .. } => CtsExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed => CtsExitCode::TEST_RUN_FAILED,
            Self::NoTestsRun => CtsExitCode::NO_TESTS_RUN,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                error!("could not access the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirNotUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::ExpectationsFileError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestRunnerBuildError { err } => {
                error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::UnsupportedMessageFormat { list_type } => {
                error!(
                    "--list-type {} only supports --message-format human",
                    list_type.style(styles.bold)
                );
                None
            }
            Self::QueryParseError { errors } => {
                display_query_parse_errors(errors);
                None
            }
            Self::CaseGenerationError { err } => {
                error!("{err}");
                None
            }
            Self::CollapseError { err } => match err {
                CollapseError::Parse(errors) => {
                    display_query_parse_errors(errors);
                    None
                }
                other => {
                    error!("{other}");
                    None
                }
            },
            Self::TestNotFound { name } => {
                error!("no cases match `{}`", name.style(styles.bold));
                None
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::WriteTestListError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteEventError { err } => {
                error!("{err}");
                err.source()
            }
            Self::RunError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
            Self::NoTestsRun => {
                error!(
                    "{}",
                    "no tests to run (the query matched no cases)".style(styles.warning_text)
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

fn display_query_parse_errors(errors: &QueryParseErrors) {
    if errors.errors.is_empty() {
        error!("{errors}");
        return;
    }
    for single_error in &errors.errors {
        let report =
            miette::Report::new(single_error.clone()).with_source_code(errors.input.clone());
        error!(target: NO_HEADING, "{:?}", report);
    }
}

impl From<RunTestsError> for ExpectedError {
    fn from(err: RunTestsError) -> Self {
        match err {
            RunTestsError::Parse(errors) => Self::QueryParseError { errors },
            RunTestsError::Generation(err) => Self::CaseGenerationError { err },
            RunTestsError::NotFound { name } => Self::TestNotFound { name },
            RunTestsError::Build(err) => Self::TestRunnerBuildError { err },
            err => Self::RunError { err },
        }
    }
}

impl From<QueryParseErrors> for ExpectedError {
    fn from(errors: QueryParseErrors) -> Self {
        Self::QueryParseError { errors }
    }
}

impl From<CaseGenerationError> for ExpectedError {
    fn from(err: CaseGenerationError) -> Self {
        Self::CaseGenerationError { err }
    }
}

impl From<CollapseError> for ExpectedError {
    fn from(err: CollapseError) -> Self {
        Self::CollapseError { err }
    }
}
