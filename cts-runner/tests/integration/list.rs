// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use cts_fixtures::catalog::EXPECTED_CASES;
use cts_query::TestQuery;
use cts_runner::{
    errors::RunTestsError,
    list::{TestTree, load_cases},
    runner::list_tests,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test_case("suite1:*", 8; "suite")]
#[test_case("suite1:foo,*", 3; "file prefix")]
#[test_case("suite1:foo:*", 3; "file")]
#[test_case("suite1:bar,*", 1; "directory")]
#[test_case("suite1:baz:*", 4; "file with params")]
#[test_case("suite1:baz:zed:*", 2; "test")]
#[test_case("suite1:baz:zed:a=1;*", 1; "param prefix")]
#[test_case("suite1:baz:zed:b=3;a=1", 1; "params in declared order")]
#[test_case("suite2:foof:bluh,*", 1; "test prefix")]
#[test_case("suite3:*", 0; "unknown suite")]
fn load_counts(query: &str, count: usize) -> Result<()> {
    test_init();
    let list = load_cases(&CATALOG, &TestQuery::parse(query)?)?;
    assert_eq!(list.len(), count, "case count for {query}");
    Ok(())
}

#[test]
fn contained_queries_select_subsets() -> Result<()> {
    test_init();
    for suite in CATALOG.suites() {
        let tree = TestTree::new(&CATALOG, &TestQuery::multi_file(suite, Vec::new()))?;
        let selected = tree
            .queries()
            .into_iter()
            .map(|query| -> Result<_> { Ok((query, load_cases(&CATALOG, query)?.names())) })
            .collect::<Result<Vec<_>>>()?;
        assert!(selected.len() > 1, "{suite} has nodes below the root");

        for (outer, outer_names) in &selected {
            for (inner, inner_names) in &selected {
                if outer.contains(inner) {
                    assert!(
                        inner_names.iter().all(|name| outer_names.contains(name)),
                        "{outer} contains {inner}, but not every case {inner} selects"
                    );
                }
            }
        }
    }
    Ok(())
}

#[test]
fn list_matches_fixtures() -> Result<()> {
    test_init();
    // Readmes register their suites first.
    assert_eq!(CATALOG.suites(), vec!["suite1", "suite2", "demo", "s"]);

    let mut expected = Vec::new();
    for suite in ["suite1", "suite2", "s", "demo"] {
        expected.extend(list_tests(&CATALOG, &format!("{suite}:*"))?);
    }
    let fixture_names: Vec<_> = EXPECTED_CASES.iter().map(|case| case.name).collect();
    assert_eq!(expected, fixture_names);
    Ok(())
}

#[test]
fn list_invalid_query() {
    test_init();
    assert!(matches!(
        list_tests(&CATALOG, "suite1:foo*"),
        Err(RunTestsError::Parse(_))
    ));
}

fn collapsed(expectations: &[&str]) -> Result<Vec<String>> {
    let tree = TestTree::new(&CATALOG, &TestQuery::parse("suite1:*")?)?;
    Ok(tree
        .iterate_collapsed(expectations)?
        .into_iter()
        .map(|query| query.to_string())
        .collect())
}

#[test_case(&[], &["suite1:foo:*", "suite1:bar,buzz,buzz:*", "suite1:baz:*"]; "no expectations")]
#[test_case(
    &["suite1:baz:wye:*"],
    &["suite1:foo:*", "suite1:bar,buzz,buzz:*", "suite1:baz:wye:*", "suite1:baz:zed,*"];
    "test expectation"
)]
#[test_case(
    &["suite1:baz:zed:*"],
    &["suite1:foo:*", "suite1:bar,buzz,buzz:*", "suite1:baz:wye,*", "suite1:baz:zed:*"];
    "other test expectation"
)]
#[test_case(
    &["suite1:baz:wye:;"],
    &[
        "suite1:foo:*",
        "suite1:bar,buzz,buzz:*",
        "suite1:baz:wye:;",
        "suite1:baz:wye:x=1;*",
        "suite1:baz:zed,*",
    ];
    "case without params"
)]
#[test_case(
    &["suite1:baz:wye:x=1;"],
    &[
        "suite1:foo:*",
        "suite1:bar,buzz,buzz:*",
        "suite1:baz:wye:;",
        "suite1:baz:wye:x=1;",
        "suite1:baz:zed,*",
    ];
    "case with params"
)]
fn collapse(expectations: &[&str], expected: &[&str]) -> Result<()> {
    test_init();
    assert_eq!(collapsed(expectations)?, expected);
    Ok(())
}

#[test_case("garbage"; "no separator")]
#[test_case("garbage*"; "wildcard without separator")]
#[test_case("suite1*"; "wildcard in suite")]
#[test_case("suite1:foo*"; "wildcard in file")]
#[test_case("suite1:foo:ba*"; "wildcard in test")]
#[test_case("garbage:*"; "unknown suite")]
#[test_case("suite1:doesntexist:*"; "unknown file")]
#[test_case("suite2:foo:*"; "file from another suite")]
#[test_case("suite1:foo,*"; "file as directory")]
fn collapse_rejects(expectation: &str) {
    test_init();
    assert!(
        collapsed(&[expectation]).is_err(),
        "{expectation} should be rejected"
    );
}

#[test]
fn write_tree() -> Result<()> {
    test_init();
    let tree = TestTree::new(&CATALOG, &TestQuery::parse("suite2:*")?)?;
    let mut buf = Vec::new();
    tree.write_to(&mut buf, false)?;
    assert_eq!(
        String::from_utf8(buf)?,
        indoc! {"
            suite2:*  desc 2a
              suite2:foof:*  desc 2b
                suite2:foof:blah,*
                  suite2:foof:blah:*
                    suite2:foof:blah:;
                suite2:foof:bleh,*
                  suite2:foof:bleh:*
                    suite2:foof:bleh:a=1;*
                      suite2:foof:bleh:a=1;
                suite2:foof:bluh,*
                  suite2:foof:bluh,a,*
                    suite2:foof:bluh,a:*
                      suite2:foof:bluh,a:;
        "}
    );
    Ok(())
}
