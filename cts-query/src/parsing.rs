// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing for test queries.
//!
//! Like the rest of the error-recovering parsers in this workspace, the high level functions
//! here:
//! - always return Ok(_)
//! - on error:
//!     - keep consuming input so later problems are reported too
//!     - return `None` instead of a result
//!     - push an error into the parsing state (in span.state)

use crate::{
    errors::*,
    params::{CaseParams, ParamValue, is_public_key},
    query::{
        BIG_SEPARATOR, PARAM_KV_SEPARATOR, PARAM_SEPARATOR, PATH_SEPARATOR, TestQuery, WILDCARD,
        has_reserved_value_chars, is_valid_query_part,
    },
};
use std::ops::Range;
use winnow::{
    LocatingSlice, Parser,
    combinator::{opt, separated, trace},
    stream::Location,
    token::take_till,
};

pub(crate) type Span<'a> = winnow::Stateful<LocatingSlice<&'a str>, State<'a>>;
type Error = ();
type PResult<T> = winnow::ModalResult<T, Error>;

pub(crate) fn new_span<'a>(input: &'a str, errors: &'a mut Vec<ParseSingleError>) -> Span<'a> {
    Span {
        input: LocatingSlice::new(input),
        state: State::new(errors),
    }
}

/// A piece of the input along with its location.
type Piece<'a> = (&'a str, Range<usize>);

/// The raw `:`-separated parts of a query.
struct BigParts<'a> {
    suite: Piece<'a>,
    file: Vec<Piece<'a>>,
    test: Option<Vec<Piece<'a>>>,
    params: Option<Vec<Piece<'a>>>,
}

/// A path part with the trailing wildcard (if any) removed.
struct ParsedPath {
    parts: Vec<String>,
    wildcard: Option<Range<usize>>,
    span: Range<usize>,
}

impl ParsedPath {
    fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.wildcard.is_none()
    }
}

fn path_piece<'i>(input: &mut Span<'i>) -> PResult<Piece<'i>> {
    take_till(0.., [PATH_SEPARATOR, BIG_SEPARATOR])
        .with_span()
        .parse_next(input)
}

fn parse_suite<'i>(input: &mut Span<'i>) -> PResult<Piece<'i>> {
    take_till(0.., [BIG_SEPARATOR]).with_span().parse_next(input)
}

fn param_piece<'i>(input: &mut Span<'i>) -> PResult<Piece<'i>> {
    take_till(0.., [PARAM_SEPARATOR]).with_span().parse_next(input)
}

fn big_separator(input: &mut Span<'_>) -> PResult<Option<char>> {
    opt(BIG_SEPARATOR).parse_next(input)
}

fn parse_path<'i>(input: &mut Span<'i>) -> PResult<Vec<Piece<'i>>> {
    trace(
        "parse_path",
        separated(0.., path_piece, PATH_SEPARATOR),
    )
    .parse_next(input)
}

fn parse_params_text<'i>(input: &mut Span<'i>) -> PResult<Vec<Piece<'i>>> {
    trace(
        "parse_params_text",
        separated(0.., param_piece, PARAM_SEPARATOR),
    )
    .parse_next(input)
}

// This parse will never fail
fn parse_big_parts<'i>(input: &mut Span<'i>) -> PResult<Option<BigParts<'i>>> {
    trace("parse_big_parts", |input: &mut Span<'i>| {
        let suite = parse_suite.parse_next(input)?;
        if big_separator.parse_next(input)?.is_none() {
            let end = input.current_token_start();
            input
                .state
                .report_error(ParseSingleError::MissingBigSeparator((end, 0).into()));
            return Ok(None);
        }

        let file = parse_path.parse_next(input)?;
        let mut test = None;
        let mut params = None;
        if big_separator.parse_next(input)?.is_some() {
            test = Some(parse_path.parse_next(input)?);
            if big_separator.parse_next(input)?.is_some() {
                // Params run to the end of the input, so values may contain `:` and `,`.
                params = Some(parse_params_text.parse_next(input)?);
            }
        }

        Ok(Some(BigParts {
            suite,
            file,
            test,
            params,
        }))
    })
    .parse_next(input)
}

fn validate_suite(state: &mut State<'_>, (suite, range): &Piece<'_>) -> Option<String> {
    if suite.is_empty() {
        state.report_error(ParseSingleError::EmptySuite(range.clone().into()));
        None
    } else if !is_valid_query_part(suite) {
        state.report_error(ParseSingleError::InvalidSuite(range.clone().into()));
        None
    } else {
        Some((*suite).to_owned())
    }
}

fn validate_path(state: &mut State<'_>, pieces: &[Piece<'_>]) -> Option<ParsedPath> {
    let span = match (pieces.first(), pieces.last()) {
        (Some(first), Some(last)) => first.1.start..last.1.end,
        _ => 0..0,
    };
    // A path with no text at all is empty rather than a blank segment.
    if let [(text, _)] = pieces
        && text.is_empty()
    {
        return Some(ParsedPath {
            parts: Vec::new(),
            wildcard: None,
            span,
        });
    }

    let mut valid = true;
    let mut parts = Vec::with_capacity(pieces.len());
    let mut wildcard = None;
    for (i, (text, range)) in pieces.iter().enumerate() {
        let is_last = i + 1 == pieces.len();
        if is_last && text.len() == 1 && text.starts_with(WILDCARD) {
            wildcard = Some(range.clone());
        } else if text.contains(WILDCARD) {
            state.report_error(ParseSingleError::MisplacedWildcard(range.clone().into()));
            valid = false;
        } else if text.is_empty() {
            state.report_error(ParseSingleError::BlankPathSegment(range.clone().into()));
            valid = false;
        } else if !is_valid_query_part(text) {
            state.report_error(ParseSingleError::InvalidPathSegment(range.clone().into()));
            valid = false;
        } else {
            parts.push((*text).to_owned());
        }
    }

    valid.then_some(ParsedPath {
        parts,
        wildcard,
        span,
    })
}

/// Reports a wildcard that isn't in the last part of the query.
fn reject_wildcard(state: &mut State<'_>, path: &ParsedPath) -> bool {
    match &path.wildcard {
        Some(range) => {
            state.report_error(ParseSingleError::MisplacedWildcard(range.clone().into()));
            false
        }
        None => true,
    }
}

enum ParsedParams {
    /// `x=1;*` or the lenient empty block.
    Prefix(CaseParams),
    /// `x=1;`, `x=1` or `;`.
    Exact(CaseParams),
}

fn validate_params(state: &mut State<'_>, pieces: &[Piece<'_>]) -> Option<ParsedParams> {
    let mut pieces = pieces;
    let mut wildcard = false;
    match pieces {
        // Empty params block.
        [(text, _)] if text.is_empty() => return Some(ParsedParams::Prefix(CaseParams::new())),
        // Lone separator: a case with no params.
        [(a, _), (b, _)] if a.is_empty() && b.is_empty() => {
            return Some(ParsedParams::Exact(CaseParams::new()));
        }
        [rest @ .., (last, _)] if last.len() == 1 && last.starts_with(WILDCARD) => {
            wildcard = true;
            pieces = rest;
        }
        [rest @ .., (last, _)] if last.is_empty() => {
            pieces = rest;
        }
        // Lenient: the last param has no trailing separator.
        _ => {}
    }

    let mut valid = true;
    let mut params = CaseParams::new();
    for (text, range) in pieces {
        match parse_single_param(state, text, range.start) {
            Some((key, value)) => {
                if params.contains_key(key) {
                    let key_span = (range.start, key.len()).into();
                    state.report_error(ParseSingleError::DuplicateParamKey(key_span));
                    valid = false;
                } else {
                    params.insert(key, value);
                }
            }
            None => valid = false,
        }
    }

    if !valid {
        return None;
    }
    Some(if wildcard {
        ParsedParams::Prefix(params)
    } else {
        ParsedParams::Exact(params)
    })
}

fn parse_single_param<'a>(
    state: &mut State<'_>,
    text: &'a str,
    start: usize,
) -> Option<(&'a str, ParamValue)> {
    let full_span = (start, text.len()).into();
    if text.is_empty() {
        state.report_error(ParseSingleError::BlankParam(full_span));
        return None;
    }
    if text.contains(WILDCARD) && !text.contains(PARAM_KV_SEPARATOR) {
        state.report_error(ParseSingleError::MisplacedWildcard(full_span));
        return None;
    }
    let Some((key, value)) = text.split_once(PARAM_KV_SEPARATOR) else {
        state.report_error(ParseSingleError::ParamMissingEquals(full_span));
        return None;
    };

    let key_span = (start, key.len()).into();
    if !is_public_key(key) {
        state.report_error(ParseSingleError::PrivateParamKey(key_span));
        return None;
    }
    if !is_valid_query_part(key) {
        state.report_error(ParseSingleError::InvalidParamKey(key_span));
        return None;
    }

    let value_span = (start + key.len() + 1, value.len()).into();
    if has_reserved_value_chars(value) {
        state.report_error(ParseSingleError::ForbiddenParamValueChars(value_span));
        return None;
    }
    if value == "undefined" {
        return Some((key, ParamValue::Undefined));
    }
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => match ParamValue::from_json(json) {
            Some(value) => Some((key, value)),
            None => {
                state.report_error(ParseSingleError::UnsupportedParamValue(value_span));
                None
            }
        },
        Err(err) => {
            state.report_error(ParseSingleError::InvalidParamValue {
                span: value_span,
                message: err.to_string(),
            });
            None
        }
    }
}

fn build_query(state: &mut State<'_>, parts: BigParts<'_>) -> Option<TestQuery> {
    let suite = validate_suite(state, &parts.suite);
    let file = validate_path(state, &parts.file);

    let Some(test_pieces) = parts.test else {
        // Multi-file queries may omit the wildcard.
        let file = file?;
        return Some(TestQuery::multi_file(suite?, file.parts));
    };

    let file = file.filter(|file| reject_wildcard(state, file));
    if let Some(file) = &file
        && file.is_empty()
    {
        state.report_error(ParseSingleError::EmptyFilePart(
            (file.span.start, 0).into(),
        ));
        return None;
    }
    let test = validate_path(state, &test_pieces);

    let Some(param_pieces) = parts.params else {
        let (suite, file, test) = (suite?, file?, test?);
        return Some(if test.wildcard.is_some() || test.parts.is_empty() {
            TestQuery::multi_test(suite, file.parts, test.parts)
        } else {
            // `s:g:t` selects every case of `t`.
            TestQuery::multi_case(suite, file.parts, test.parts, CaseParams::new())
        });
    };

    let test = test.filter(|test| reject_wildcard(state, test));
    if let Some(test) = &test
        && test.is_empty()
    {
        state.report_error(ParseSingleError::EmptyTestPart(
            (test.span.start, 0).into(),
        ));
        return None;
    }
    let params = validate_params(state, &param_pieces);

    let (suite, file, test, params) = (suite?, file?, test?, params?);
    Some(match params {
        ParsedParams::Prefix(params) => {
            TestQuery::multi_case(suite, file.parts, test.parts, params)
        }
        ParsedParams::Exact(params) => {
            TestQuery::single_case(suite, file.parts, test.parts, params)
        }
    })
}

// This parse will never fail
fn parse_query<'i>(input: &mut Span<'i>) -> PResult<Option<TestQuery>> {
    trace("parse_query", |input: &mut Span<'i>| {
        let Some(parts) = parse_big_parts.parse_next(input)? else {
            return Ok(None);
        };
        Ok(build_query(&mut input.state, parts))
    })
    .parse_next(input)
}

// ---

pub(crate) fn parse(input: Span<'_>) -> Result<Option<TestQuery>, winnow::error::ErrMode<Error>> {
    let (_, query) = parse_query.parse_peek(input)?;
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::SourceSpan;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[track_caller]
    fn parse_ok(input: &str) -> TestQuery {
        match TestQuery::parse(input) {
            Ok(query) => query,
            Err(errors) => {
                for single_error in &errors.errors {
                    let report = miette::Report::new(single_error.clone())
                        .with_source_code(input.to_owned());
                    eprintln!("{report:?}");
                }
                panic!("Not a valid query!")
            }
        }
    }

    #[track_caller]
    fn parse_err(input: &str) -> Vec<ParseSingleError> {
        match TestQuery::parse(input) {
            Ok(query) => panic!("{input} parsed successfully as {query:?}"),
            Err(errors) => {
                assert_eq!(errors.input, input);
                errors.errors
            }
        }
    }

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test_case("s:*"; "suite")]
    #[test_case("s:a,*"; "directory")]
    #[test_case("s:a,b,*"; "nested directory")]
    #[test_case("s:a:*"; "file")]
    #[test_case("s:a,b:t,*"; "test prefix")]
    #[test_case("s:a:t:*"; "test")]
    #[test_case("s:a:t,u:x=1;*"; "param prefix")]
    #[test_case("s:a:t:x=1;"; "single case")]
    #[test_case("s:a:t:;"; "single case without params")]
    #[test_case(r#"s:a:t:x=1;y="a:b,c";z=null;w=undefined;v=true;u=-0.5;"#; "all value kinds")]
    fn canonical_roundtrip(input: &str) {
        assert_eq!(parse_ok(input).to_string(), input);
    }

    #[test_case("s:a,b", "s:a,b,*"; "multi-file without wildcard")]
    #[test_case("s:", "s:*"; "empty file part")]
    #[test_case("s:g:t", "s:g:t:*"; "test without params block")]
    #[test_case("s:g:t:", "s:g:t:*"; "empty params block")]
    #[test_case("s:g:", "s:g:*"; "empty test part")]
    #[test_case("s:g:t:x=1", "s:g:t:x=1;"; "single case without trailing separator")]
    #[test_case("s:g:t:x=1;y=2", "s:g:t:x=1;y=2;"; "two params without trailing separator")]
    fn lenient_forms(input: &str, canonical: &str) {
        assert_eq!(parse_ok(input).to_string(), canonical);
    }

    #[test]
    fn parse_levels() {
        assert_eq!(
            parse_ok("s:a,b,*"),
            TestQuery::multi_file("s", path(&["a", "b"]))
        );
        assert_eq!(
            parse_ok("s:a:t,*"),
            TestQuery::multi_test("s", path(&["a"]), path(&["t"]))
        );
        assert_eq!(
            parse_ok("s:a:t:x=1;*"),
            TestQuery::multi_case("s", path(&["a"]), path(&["t"]), CaseParams::new().with("x", 1u32))
        );
        assert_eq!(
            parse_ok(r#"s:a:t:x="ab";"#),
            TestQuery::single_case(
                "s",
                path(&["a"]),
                path(&["t"]),
                CaseParams::new().with("x", "ab")
            )
        );
    }

    #[test]
    fn params_keep_order() {
        let query = parse_ok("s:a:t:b=1;a=2;");
        let keys: Vec<_> = query
            .params()
            .expect("case-level query")
            .iter()
            .map(|(k, _)| k.to_owned())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn colon_inside_param_value() {
        let query = parse_ok(r#"s:a:t:x="1:2:3";"#);
        assert_eq!(
            query.params().and_then(|p| p.get("x")),
            Some(&ParamValue::from("1:2:3"))
        );
    }

    #[test_case("s", ParseSingleError::MissingBigSeparator((1, 0).into()); "missing separator")]
    #[test_case(":*", ParseSingleError::EmptySuite((0, 0).into()); "empty suite")]
    #[test_case("s-x:*", ParseSingleError::InvalidSuite((0, 3).into()); "invalid suite")]
    #[test_case("s:a,,b,*", ParseSingleError::BlankPathSegment((4, 0).into()); "blank segment")]
    #[test_case("s:a-b,*", ParseSingleError::InvalidPathSegment((2, 3).into()); "invalid segment")]
    #[test_case("s:a*,*", ParseSingleError::MisplacedWildcard((2, 2).into()); "wildcard inside segment")]
    #[test_case("s:*,a", ParseSingleError::MisplacedWildcard((2, 1).into()); "wildcard not last")]
    #[test_case("s:a,*:*", ParseSingleError::MisplacedWildcard((4, 1).into()); "wildcard in file part")]
    #[test_case("s:a:t,*:*", ParseSingleError::MisplacedWildcard((6, 1).into()); "wildcard in test part")]
    #[test_case("s::t", ParseSingleError::EmptyFilePart((2, 0).into()); "empty file part")]
    #[test_case("s:a::x=1;", ParseSingleError::EmptyTestPart((4, 0).into()); "empty test part")]
    #[test_case("s:a:t:x=1;;", ParseSingleError::BlankParam((10, 0).into()); "blank param")]
    #[test_case("s:a:t:x;", ParseSingleError::ParamMissingEquals((6, 1).into()); "missing equals")]
    #[test_case("s:a:t:_x=1;", ParseSingleError::PrivateParamKey((6, 2).into()); "private key")]
    #[test_case("s:a:t:x-y=1;", ParseSingleError::InvalidParamKey((6, 3).into()); "invalid key")]
    #[test_case("s:a:t:x=1;x=2;", ParseSingleError::DuplicateParamKey((10, 1).into()); "duplicate key")]
    #[test_case("s:a:t:x=a=b;", ParseSingleError::ForbiddenParamValueChars((8, 3).into()); "forbidden chars")]
    #[test_case("s:a:t:x=[1];", ParseSingleError::UnsupportedParamValue((8, 3).into()); "array value")]
    #[test_case("s:a:t:x=*;", ParseSingleError::ForbiddenParamValueChars((8, 1).into()); "wildcard value")]
    #[test_case("s:a:t:*;", ParseSingleError::MisplacedWildcard((6, 1).into()); "params wildcard not last")]
    fn single_error(input: &str, expected: ParseSingleError) {
        assert_eq!(parse_err(input), vec![expected]);
    }

    #[test]
    fn invalid_json_value() {
        let errors = parse_err("s:a:t:x=abc;");
        assert_eq!(errors.len(), 1);
        assert!(
            matches!(
                &errors[0],
                ParseSingleError::InvalidParamValue { span, .. } if *span == SourceSpan::from((8, 3))
            ),
            "{errors:?}"
        );
    }

    #[test]
    fn multiple_errors_reported_together() {
        let errors = parse_err("s-x:a,,b:t:_k=1;j=[];");
        assert_eq!(
            errors,
            vec![
                ParseSingleError::InvalidSuite((0, 3).into()),
                ParseSingleError::BlankPathSegment((6, 0).into()),
                ParseSingleError::PrivateParamKey((11, 2).into()),
                ParseSingleError::UnsupportedParamValue((18, 2).into()),
            ]
        );
    }
}
