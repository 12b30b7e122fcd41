// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the CTS runner.

use crate::{helpers::plural, reporter::StatusLevel};
use camino::Utf8PathBuf;
use config::ConfigError;
use cts_query::errors::{ParamMergeError, QueryBuildError, QueryParseErrors};
use itertools::Itertools;
use std::{fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse cts config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file this error is for.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// An expectation in a profile has an invalid query.
    #[error("invalid query for expectation {index} in profile `{profile}`")]
    InvalidExpectation {
        /// The profile the expectation is in.
        profile: String,
        /// The index of the expectation within the profile.
        index: usize,
        /// The parse error.
        #[source]
        err: QueryParseErrors,
    },
}

/// An error which indicates that a profile was requested but not known to cts.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// Error returned while parsing a [`StatusLevel`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for status-level: {input}\n(known values: {})",
    StatusLevel::variants().join(", "),
)]
pub struct StatusLevelParseError {
    input: String,
}

impl StatusLevelParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while reading an expectations file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExpectationsFileError {
    /// The file could not be read.
    #[error("failed to read expectations file `{path}`")]
    Read {
        /// The path to the file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The file is not valid TOML, or doesn't have the expected shape.
    #[error("failed to parse expectations file `{path}`")]
    Parse {
        /// The path to the file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// An expectation has an invalid query.
    #[error("invalid query for expectation {index} in `{path}`")]
    InvalidQuery {
        /// The path to the file.
        path: Utf8PathBuf,
        /// The index of the expectation.
        index: usize,
        /// The parse error.
        #[source]
        error: QueryParseErrors,
    },
}

/// An error that occurred while registering spec files or tests in a catalog.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    /// A path part is not a valid query part.
    #[error("invalid {what} `{part}` in `{path}`: parts must match [A-Za-z0-9_]+")]
    InvalidPathPart {
        /// What kind of path this is ("file path" or "test name").
        what: &'static str,
        /// The full path as given.
        path: String,
        /// The offending part.
        part: String,
    },

    /// A spec file path or test name was empty.
    #[error("empty {what}")]
    EmptyPath {
        /// What kind of path this is.
        what: &'static str,
    },

    /// The same suite and file path was registered twice.
    #[error("duplicate spec file `{suite}:{path}`")]
    DuplicateSpecFile {
        /// The suite name.
        suite: String,
        /// The file path, joined with `,`.
        path: String,
    },

    /// The same test path was registered twice within one group.
    #[error("duplicate test name `{name}`")]
    DuplicateTestName {
        /// The test name, joined with `,`.
        name: String,
    },

    /// The suite name is not a valid query part.
    #[error("invalid suite name `{suite}`: suite names must match [A-Za-z0-9_]+")]
    InvalidSuite {
        /// The suite name.
        suite: String,
    },
}

/// An error reported by a params generator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParamsError {
    /// Two combined sources both assigned the same key.
    #[error(transparent)]
    Merge(#[from] ParamMergeError),

    /// A user-supplied generator failed.
    #[error("params generator failed: {message}")]
    Generator {
        /// The message reported by the generator.
        message: String,
    },
}

impl ParamsError {
    /// Creates a new generator error.
    pub fn generator(message: impl Into<String>) -> Self {
        Self::Generator {
            message: message.into(),
        }
    }
}

/// A problem with one generated case of a test.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaseParamsError {
    /// The params source failed.
    #[error(transparent)]
    Params(#[from] ParamsError),

    /// Two cases of the same test have identical public params.
    #[error("duplicate public params `{params}`")]
    DuplicateParams {
        /// The duplicated params, in query form.
        params: String,
    },

    /// The case's params can't be expressed as a query.
    #[error(transparent)]
    Query(#[from] QueryBuildError),

    /// The params source panicked. Cases generated before the panic are discarded.
    #[error("params generator panicked: {message}")]
    GeneratorPanicked {
        /// The panic message.
        message: String,
    },
}

/// Case generation failed for one test.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to generate cases for `{test}`")]
pub struct NodeGenerationError {
    /// The test, as a multi-case query.
    pub test: String,

    /// The problems found, in generation order.
    pub errors: Vec<CaseParamsError>,
}

impl NodeGenerationError {
    /// Writes this error and its case errors as an indented list.
    fn fmt_list(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {}:", self.test)?;
        for error in &self.errors {
            writeln!(f, "    - {error}")?;
        }
        Ok(())
    }
}

/// Case generation failed for one or more tests.
///
/// All matching tests are resolved before this is returned, so every failing test is listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseGenerationError {
    /// The tests that failed, in catalog order.
    pub errors: Vec<NodeGenerationError>,
}

impl fmt::Display for CaseGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "failed to generate cases for {} {}:",
            self.errors.len(),
            plural::tests_str(self.errors.len()),
        )?;
        for error in &self.errors {
            error.fmt_list(f)?;
        }
        Ok(())
    }
}

impl std::error::Error for CaseGenerationError {}

/// An error returned by the tree's collapsed query list.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CollapseError {
    /// An expectation could not be parsed.
    #[error("invalid expectation query")]
    Parse(#[from] QueryParseErrors),

    /// Expectations didn't match any node of the tree.
    #[error(
        "expectations did not match any node of the tree: {}",
        .queries.iter().join(", ")
    )]
    Unmatched {
        /// The queries that didn't match.
        queries: Vec<String>,
    },
}

/// An error returned by the runner's list and run operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunTestsError {
    /// The query could not be parsed.
    #[error(transparent)]
    Parse(#[from] QueryParseErrors),

    /// Cases could not be generated.
    #[error(transparent)]
    Generation(#[from] CaseGenerationError),

    /// A single test was requested, but nothing matched it.
    #[error("test not found: {name}")]
    NotFound {
        /// The requested name.
        name: String,
    },

    /// The runner couldn't be built.
    #[error(transparent)]
    Build(#[from] TestRunnerBuildError),
}

/// An error that occurred while building the test runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),

    /// An error occurred while setting up signals.
    #[error("error setting up signals")]
    SignalHandlerSetupError(#[from] SignalHandlerSetupError),
}

/// An error occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] io::Error);

/// An error that occurred while writing a test list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteTestListError {
    /// An error occurred while writing the list to the provided output.
    #[error("error writing to output")]
    Io(#[source] io::Error),

    /// An error occurred while serializing JSON.
    #[error("error serializing to JSON")]
    Json(#[source] serde_json::Error),
}

/// An error that occurred while writing reporter output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] io::Error),

    /// An error occurred while serializing JSON.
    #[error("error serializing to JSON")]
    Json(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn profile_not_found_sorts_profiles() {
        let err = ProfileNotFound::new("foo", ["default", "ci", "nightly"]);
        assert_eq!(
            err.to_string(),
            "profile `foo` not found (known profiles: ci, default, nightly)"
        );
    }

    #[test]
    fn case_generation_error_lists_tests() {
        let err = CaseGenerationError {
            errors: vec![NodeGenerationError {
                test: "s:g:t:*".to_owned(),
                errors: vec![
                    CaseParamsError::DuplicateParams {
                        params: "x=1;".to_owned(),
                    },
                    CaseParamsError::Params(ParamsError::generator("oops")),
                ],
            }],
        };
        assert_eq!(
            err.to_string(),
            "failed to generate cases for 1 test:\n  \
             s:g:t:*:\n    \
             - duplicate public params `x=1;`\n    \
             - params generator failed: oops\n"
        );
    }
}
