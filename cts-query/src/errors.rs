// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while parsing and building queries.

use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

/// A set of errors that occurred while parsing a query string.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct QueryParseErrors {
    /// The input string.
    pub input: String,

    /// The parse errors returned.
    pub errors: Vec<ParseSingleError>,
}

impl QueryParseErrors {
    pub(crate) fn new(input: impl Into<String>, errors: Vec<ParseSingleError>) -> Self {
        Self {
            input: input.into(),
            errors,
        }
    }
}

impl fmt::Display for QueryParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse query `{}`", self.input)?;
        if let Some(first) = self.errors.first() {
            write!(f, ": {first}")?;
            if self.errors.len() > 1 {
                write!(f, " (and {} more)", self.errors.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for QueryParseErrors {}

impl Diagnostic for QueryParseErrors {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.input)
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        Some(Box::new(
            self.errors.iter().map(|error| error as &dyn Diagnostic),
        ))
    }
}

/// A single error that occurred while parsing a query string.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseSingleError {
    #[error("expected `:` after the suite name")]
    MissingBigSeparator(#[label("a query must contain at least one `:`")] SourceSpan),
    #[error("empty suite name")]
    EmptySuite(#[label("suite name missing")] SourceSpan),
    #[error("invalid suite name")]
    InvalidSuite(#[label("suite names must match [A-Za-z0-9_]+")] SourceSpan),
    #[error("invalid path segment")]
    InvalidPathSegment(#[label("path segments must match [A-Za-z0-9_]+")] SourceSpan),
    #[error("blank path segment")]
    BlankPathSegment(#[label("is there a stray `,`?")] SourceSpan),
    #[error("misplaced wildcard")]
    MisplacedWildcard(#[label("`*` must be the complete last part of the query")] SourceSpan),
    #[error("empty file part")]
    EmptyFilePart(#[label("file part of a test-level query is empty (`::`)")] SourceSpan),
    #[error("empty test part")]
    EmptyTestPart(#[label("test part of a case-level query is empty (`::`)")] SourceSpan),
    #[error("blank param")]
    BlankParam(#[label("is there a stray `;`?")] SourceSpan),
    #[error("param must be of the form key=value")]
    ParamMissingEquals(#[label("missing `=`")] SourceSpan),
    #[error("private param in query")]
    PrivateParamKey(#[label("keys starting with `_` can't appear in queries")] SourceSpan),
    #[error("invalid param key")]
    InvalidParamKey(#[label("param keys must match [A-Za-z0-9_]+")] SourceSpan),
    #[error("duplicate param key")]
    DuplicateParamKey(#[label("key already specified")] SourceSpan),
    #[error("forbidden characters in param value")]
    ForbiddenParamValueChars(#[label("values must not contain `=`, `;` or `*`")] SourceSpan),
    #[error("invalid param value")]
    InvalidParamValue {
        #[label("{}", message)]
        span: SourceSpan,
        message: String,
    },
    #[error("unsupported param value")]
    UnsupportedParamValue(#[label("arrays and objects can't be used as query values")] SourceSpan),

    #[error("unknown parsing error")]
    Unknown,
}

#[derive(Debug)]
pub(crate) struct State<'a> {
    errors: &'a mut Vec<ParseSingleError>,
}

impl<'a> State<'a> {
    pub fn new(errors: &'a mut Vec<ParseSingleError>) -> Self {
        Self { errors }
    }

    pub fn report_error(&mut self, error: ParseSingleError) {
        self.errors.push(error);
    }
}

/// An error that occurred while merging two sets of case parameters.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("duplicate param key `{key}` while merging case params")]
pub struct ParamMergeError {
    /// The key that appeared on both sides.
    pub key: String,
}

/// An error returned when a case's params can't be expressed as a query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryBuildError {
    /// A value contains characters reserved by the query grammar.
    #[error("value `{value}` for param `{key}` contains `=`, `;` or `*`")]
    ReservedCharsInValue {
        /// The param key.
        key: String,
        /// The serialized value.
        value: String,
    },

    /// A public key is not a valid query part.
    #[error("param key `{key}` must match [A-Za-z0-9_]+")]
    InvalidKey {
        /// The param key.
        key: String,
    },

    /// A path part is not a valid query part.
    #[error("path part `{part}` must match [A-Za-z0-9_]+")]
    InvalidPathPart {
        /// The offending part.
        part: String,
    },
}
