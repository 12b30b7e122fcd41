// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    compare::{Ordering, compare_queries},
    errors::{ParseSingleError, QueryBuildError, QueryParseErrors},
    params::{CaseParams, is_public_key},
    parsing::{self, new_span},
};
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Separates the suite, file, test and params parts of a query.
pub const BIG_SEPARATOR: char = ':';
/// Separates the segments of a file or test path.
pub const PATH_SEPARATOR: char = ',';
/// Terminates each `key=value` pair in the params part.
pub const PARAM_SEPARATOR: char = ';';
/// Separates a param key from its value.
pub const PARAM_KV_SEPARATOR: char = '=';
/// Marks a query as selecting everything below it.
pub const WILDCARD: char = '*';

/// Returns true if `part` can be used as a path segment or param key.
pub fn is_valid_query_part(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Returns true if a serialized param value contains characters reserved by the grammar.
pub(crate) fn has_reserved_value_chars(value: &str) -> bool {
    value.contains([PARAM_KV_SEPARATOR, PARAM_SEPARATOR, WILDCARD])
}

/// The granularity of a [`TestQuery`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryLevel {
    /// Every test under a file path prefix.
    MultiFile,
    /// Every test under a test path prefix within one file.
    MultiTest,
    /// Every case of one test whose params start with a prefix.
    MultiCase,
    /// Exactly one case.
    SingleCase,
}

impl fmt::Display for QueryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiFile => write!(f, "multi-file"),
            Self::MultiTest => write!(f, "multi-test"),
            Self::MultiCase => write!(f, "multi-case"),
            Self::SingleCase => write!(f, "single-case"),
        }
    }
}

/// A query selecting a set of test cases.
///
/// The canonical string forms are:
///
/// * `suite:a,b,*` (multi-file)
/// * `suite:a,b:t,*` (multi-test)
/// * `suite:a,b:t:x=1;*` (multi-case)
/// * `suite:a,b:t:x=1;` (single-case, with `suite:a,b:t:;` for a case with no params)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestQuery {
    /// Everything under a file path prefix.
    MultiFile {
        /// The suite name.
        suite: String,
        /// The file path prefix.
        file: Vec<String>,
    },
    /// Every test under a test path prefix.
    MultiTest {
        /// The suite name.
        suite: String,
        /// The file path.
        file: Vec<String>,
        /// The test path prefix.
        test: Vec<String>,
    },
    /// Every case of a test whose public params start with `params`.
    MultiCase {
        /// The suite name.
        suite: String,
        /// The file path.
        file: Vec<String>,
        /// The test path.
        test: Vec<String>,
        /// The params prefix.
        params: CaseParams,
    },
    /// Exactly one case.
    SingleCase {
        /// The suite name.
        suite: String,
        /// The file path.
        file: Vec<String>,
        /// The test path.
        test: Vec<String>,
        /// The public params of the case.
        params: CaseParams,
    },
}

impl TestQuery {
    /// Parses a query string.
    ///
    /// All problems with the input are reported together.
    pub fn parse(input: &str) -> Result<Self, QueryParseErrors> {
        let mut errors = Vec::new();
        let result = parsing::parse(new_span(input, &mut errors));
        match result {
            Ok(Some(query)) if errors.is_empty() => Ok(query),
            _ => {
                if errors.is_empty() {
                    errors.push(ParseSingleError::Unknown);
                }
                Err(QueryParseErrors::new(input, errors))
            }
        }
    }

    /// Creates a multi-file query.
    pub fn multi_file(suite: impl Into<String>, file: Vec<String>) -> Self {
        Self::MultiFile {
            suite: suite.into(),
            file,
        }
    }

    /// Creates a multi-test query.
    pub fn multi_test(suite: impl Into<String>, file: Vec<String>, test: Vec<String>) -> Self {
        Self::MultiTest {
            suite: suite.into(),
            file,
            test,
        }
    }

    /// Creates a multi-case query.
    pub fn multi_case(
        suite: impl Into<String>,
        file: Vec<String>,
        test: Vec<String>,
        params: CaseParams,
    ) -> Self {
        Self::MultiCase {
            suite: suite.into(),
            file,
            test,
            params,
        }
    }

    /// Creates a single-case query without validating it.
    pub fn single_case(
        suite: impl Into<String>,
        file: Vec<String>,
        test: Vec<String>,
        params: CaseParams,
    ) -> Self {
        Self::SingleCase {
            suite: suite.into(),
            file,
            test,
            params,
        }
    }

    /// Creates a single-case query from the full params of a case.
    ///
    /// Private params are dropped. Fails if the result could not be parsed back from its string
    /// form.
    pub fn try_single_case(
        suite: impl Into<String>,
        file: &[String],
        test: &[String],
        params: &CaseParams,
    ) -> Result<Self, QueryBuildError> {
        for part in file.iter().chain(test) {
            if !is_valid_query_part(part) {
                return Err(QueryBuildError::InvalidPathPart { part: part.clone() });
            }
        }
        let public = params.public();
        for (key, value) in public.iter() {
            if !is_valid_query_part(key) {
                return Err(QueryBuildError::InvalidKey {
                    key: key.to_owned(),
                });
            }
            let value = value.to_string();
            if has_reserved_value_chars(&value) {
                return Err(QueryBuildError::ReservedCharsInValue {
                    key: key.to_owned(),
                    value,
                });
            }
        }
        Ok(Self::single_case(suite, file.to_vec(), test.to_vec(), public))
    }

    /// Returns the level of this query.
    pub fn level(&self) -> QueryLevel {
        match self {
            Self::MultiFile { .. } => QueryLevel::MultiFile,
            Self::MultiTest { .. } => QueryLevel::MultiTest,
            Self::MultiCase { .. } => QueryLevel::MultiCase,
            Self::SingleCase { .. } => QueryLevel::SingleCase,
        }
    }

    /// Returns the suite name.
    pub fn suite(&self) -> &str {
        match self {
            Self::MultiFile { suite, .. }
            | Self::MultiTest { suite, .. }
            | Self::MultiCase { suite, .. }
            | Self::SingleCase { suite, .. } => suite,
        }
    }

    /// Returns the file path (or path prefix, for multi-file queries).
    pub fn file(&self) -> &[String] {
        match self {
            Self::MultiFile { file, .. }
            | Self::MultiTest { file, .. }
            | Self::MultiCase { file, .. }
            | Self::SingleCase { file, .. } => file,
        }
    }

    /// Returns the test path, if this query is at test level or below.
    pub fn test(&self) -> Option<&[String]> {
        match self {
            Self::MultiFile { .. } => None,
            Self::MultiTest { test, .. }
            | Self::MultiCase { test, .. }
            | Self::SingleCase { test, .. } => Some(test),
        }
    }

    /// Returns the params, if this query is at case level.
    pub fn params(&self) -> Option<&CaseParams> {
        match self {
            Self::MultiFile { .. } | Self::MultiTest { .. } => None,
            Self::MultiCase { params, .. } | Self::SingleCase { params, .. } => Some(params),
        }
    }

    /// Returns true unless this is a single-case query.
    pub fn ends_with_wildcard(&self) -> bool {
        !matches!(self, Self::SingleCase { .. })
    }

    /// Returns true if every case selected by `other` is also selected by `self`.
    pub fn contains(&self, other: &TestQuery) -> bool {
        matches!(
            compare_queries(self, other),
            Ordering::Equal | Ordering::StrictSuperset
        )
    }

    /// Returns the ordering of `self` relative to `other`.
    pub fn compare(&self, other: &TestQuery) -> Ordering {
        compare_queries(self, other)
    }
}

struct DisplayPath<'a>(&'a [String]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Writes a path followed by a wildcard, e.g. `a,b,*` or `*`.
fn write_path_wildcard(f: &mut fmt::Formatter<'_>, path: &[String]) -> fmt::Result {
    if path.is_empty() {
        write!(f, "{WILDCARD}")
    } else {
        write!(f, "{}{PATH_SEPARATOR}{WILDCARD}", DisplayPath(path))
    }
}

impl fmt::Display for TestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiFile { suite, file } => {
                write!(f, "{suite}{BIG_SEPARATOR}")?;
                write_path_wildcard(f, file)
            }
            Self::MultiTest { suite, file, test } => {
                write!(f, "{suite}{BIG_SEPARATOR}{}{BIG_SEPARATOR}", DisplayPath(file))?;
                write_path_wildcard(f, test)
            }
            Self::MultiCase {
                suite,
                file,
                test,
                params,
            } => write!(
                f,
                "{suite}{BIG_SEPARATOR}{}{BIG_SEPARATOR}{}{BIG_SEPARATOR}{params}{WILDCARD}",
                DisplayPath(file),
                DisplayPath(test),
            ),
            Self::SingleCase {
                suite,
                file,
                test,
                params,
            } => {
                write!(
                    f,
                    "{suite}{BIG_SEPARATOR}{}{BIG_SEPARATOR}{}{BIG_SEPARATOR}",
                    DisplayPath(file),
                    DisplayPath(test),
                )?;
                if params.is_empty() {
                    write!(f, "{PARAM_SEPARATOR}")
                } else {
                    write!(f, "{params}")
                }
            }
        }
    }
}

impl FromStr for TestQuery {
    type Err = QueryParseErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TestQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn display_canonical_forms() {
        assert_eq!(TestQuery::multi_file("s", vec![]).to_string(), "s:*");
        assert_eq!(
            TestQuery::multi_file("s", path(&["a", "b"])).to_string(),
            "s:a,b,*"
        );
        assert_eq!(
            TestQuery::multi_test("s", path(&["a"]), vec![]).to_string(),
            "s:a:*"
        );
        assert_eq!(
            TestQuery::multi_test("s", path(&["a"]), path(&["t"])).to_string(),
            "s:a:t,*"
        );
        assert_eq!(
            TestQuery::multi_case("s", path(&["a"]), path(&["t"]), CaseParams::new()).to_string(),
            "s:a:t:*"
        );
        assert_eq!(
            TestQuery::multi_case(
                "s",
                path(&["a"]),
                path(&["t"]),
                CaseParams::new().with("x", 1u32)
            )
            .to_string(),
            "s:a:t:x=1;*"
        );
        assert_eq!(
            TestQuery::single_case("s", path(&["g"]), path(&["t"]), CaseParams::new())
                .to_string(),
            "s:g:t:;"
        );
        assert_eq!(
            TestQuery::single_case(
                "s",
                path(&["g"]),
                path(&["t", "u"]),
                CaseParams::new().with("x", 1u32).with("y", "a:b"),
            )
            .to_string(),
            r#"s:g:t,u:x=1;y="a:b";"#
        );
    }

    #[test]
    fn try_single_case_drops_private_and_checks_values() {
        let params = CaseParams::new().with("x", 1u32).with("_p", "ignored;*");
        let query = TestQuery::try_single_case("s", &path(&["g"]), &path(&["t"]), &params)
            .expect("private params are dropped");
        assert_eq!(query.to_string(), "s:g:t:x=1;");

        let bad = CaseParams::new().with("x", "a=b");
        assert_eq!(
            TestQuery::try_single_case("s", &path(&["g"]), &path(&["t"]), &bad),
            Err(QueryBuildError::ReservedCharsInValue {
                key: "x".to_owned(),
                value: r#""a=b""#.to_owned(),
            })
        );

        let bad_key = CaseParams::new().with("bad-key", 1u32);
        assert_eq!(
            TestQuery::try_single_case("s", &path(&["g"]), &path(&["t"]), &bad_key),
            Err(QueryBuildError::InvalidKey {
                key: "bad-key".to_owned(),
            })
        );
    }

    #[test]
    fn accessors() {
        let query = TestQuery::multi_case(
            "s",
            path(&["a", "b"]),
            path(&["t"]),
            CaseParams::new().with("x", true),
        );
        assert_eq!(query.level(), QueryLevel::MultiCase);
        assert_eq!(query.suite(), "s");
        assert_eq!(query.file(), &["a", "b"]);
        assert_eq!(query.test(), Some(&path(&["t"])[..]));
        assert_eq!(query.params().map(|p| p.len()), Some(1));
        assert!(query.ends_with_wildcard());

        let file = TestQuery::multi_file("s", vec![]);
        assert_eq!(file.test(), None);
        assert_eq!(file.params(), None);
    }
}
