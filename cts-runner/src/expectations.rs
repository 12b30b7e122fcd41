// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expected outcomes for known failures.
//!
//! An expectation pairs a query with the status the cases it contains are expected to end with.
//! The first expectation containing a case applies to it.

use crate::errors::ExpectationsFileError;
use camino::Utf8Path;
use cts_metadata::Status;
use cts_query::{TestQuery, errors::QueryParseErrors};
use serde::Deserialize;

/// An expected outcome for every case a query contains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expectation {
    query: TestQuery,
    expected: Status,
}

impl Expectation {
    /// Creates a new expectation.
    pub fn new(query: TestQuery, expected: Status) -> Self {
        Self { query, expected }
    }

    /// Parses the query and creates a new expectation.
    pub fn parse(query: &str, expected: Status) -> Result<Self, QueryParseErrors> {
        Ok(Self::new(TestQuery::parse(query)?, expected))
    }

    /// Returns the query.
    pub fn query(&self) -> &TestQuery {
        &self.query
    }

    /// Returns the expected status.
    pub fn expected(&self) -> Status {
        self.expected
    }

    /// Reads expectations from a TOML file with `[[expectation]]` tables.
    ///
    /// ```toml
    /// [[expectation]]
    /// query = "webgpu:api,operation,buffers:*"
    /// expected = "fail"
    /// ```
    pub fn from_file(path: &Utf8Path) -> Result<Vec<Self>, ExpectationsFileError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| ExpectationsFileError::Read {
                path: path.to_owned(),
                error,
            })?;
        Self::from_toml_str(path, &contents)
    }

    /// Parses the contents of an expectations file. `path` is used for error messages.
    pub fn from_toml_str(
        path: &Utf8Path,
        contents: &str,
    ) -> Result<Vec<Self>, ExpectationsFileError> {
        let file: ExpectationsFile =
            toml::from_str(contents).map_err(|error| ExpectationsFileError::Parse {
                path: path.to_owned(),
                error,
            })?;
        file.expectation
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                source
                    .compile()
                    .map_err(|error| ExpectationsFileError::InvalidQuery {
                        path: path.to_owned(),
                        index,
                        error,
                    })
            })
            .collect()
    }
}

/// Returns the expected status of the first expectation containing `query`.
pub(crate) fn find_expected(expectations: &[Expectation], query: &TestQuery) -> Option<Status> {
    expectations
        .iter()
        .find(|expectation| expectation.query.contains(query))
        .map(|expectation| expectation.expected)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ExpectationSource {
    query: String,
    expected: Status,
}

impl ExpectationSource {
    pub(crate) fn compile(&self) -> Result<Expectation, QueryParseErrors> {
        Expectation::parse(&self.query, self.expected)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectationsFile {
    #[serde(default)]
    expectation: Vec<ExpectationSource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_expectations_file() {
        let contents = indoc! {r#"
            [[expectation]]
            query = "s:g:t:x=2;"
            expected = "fail"

            [[expectation]]
            query = "s:*"
            expected = "skip"
        "#};
        let expectations =
            Expectation::from_toml_str(Utf8Path::new("expectations.toml"), contents)
                .expect("valid expectations");
        assert_eq!(
            expectations,
            vec![
                Expectation::parse("s:g:t:x=2;", Status::Fail).unwrap(),
                Expectation::parse("s:*", Status::Skip).unwrap(),
            ]
        );

        let case = TestQuery::parse("s:g:t:x=2;").unwrap();
        assert_eq!(find_expected(&expectations, &case), Some(Status::Fail));
        let other = TestQuery::parse("s:g:t:x=1;").unwrap();
        assert_eq!(find_expected(&expectations, &other), Some(Status::Skip));
        let elsewhere = TestQuery::parse("u:g:t:x=1;").unwrap();
        assert_eq!(find_expected(&expectations, &elsewhere), None);
    }

    #[test]
    fn empty_file_has_no_expectations() {
        let expectations = Expectation::from_toml_str(Utf8Path::new("e.toml"), "")
            .expect("empty file is valid");
        assert!(expectations.is_empty());
    }

    #[test]
    fn invalid_query_reports_index() {
        let contents = indoc! {r#"
            [[expectation]]
            query = "s:*"
            expected = "fail"

            [[expectation]]
            query = "garbage"
            expected = "fail"
        "#};
        let err = Expectation::from_toml_str(Utf8Path::new("e.toml"), contents)
            .expect_err("second query is invalid");
        assert!(
            matches!(err, ExpectationsFileError::InvalidQuery { index: 1, .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn unknown_status_is_an_error() {
        let contents = indoc! {r#"
            [[expectation]]
            query = "s:*"
            expected = "flaky"
        "#};
        let err = Expectation::from_toml_str(Utf8Path::new("e.toml"), contents)
            .expect_err("unknown status");
        assert!(
            matches!(err, ExpectationsFileError::Parse { .. }),
            "unexpected error: {err:?}"
        );
    }
}
