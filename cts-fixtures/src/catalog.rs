// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixture catalog and the outcomes its cases are expected to have.
//!
//! Suites:
//! * `suite1` and `suite2` are small trees used for listing and collapsing queries.
//! * `s` has a single test with one passing and one failing case.
//! * `demo` exercises every way a body can end: warnings, skips, panics, eventual expectations,
//!   subcases and device requests.

use crate::models::CaseFixture;
use cts_metadata::Status;
use cts_query::CaseParams;
use cts_runner::{
    catalog::{Catalog, TestGroup},
    errors::CatalogError,
    params::{params, pbool, poptions},
    runner::CaseError,
};
use std::time::Duration;

/// Builds the fixture catalog.
pub fn catalog() -> Result<Catalog, CatalogError> {
    let mut builder = Catalog::builder();

    builder.add_readme("suite1", "", "desc 1a")?;
    builder.add_spec_file("suite1", "foo", "desc 1b", suite1_foo()?)?;
    builder.add_readme("suite1", "bar", "desc 1c")?;
    builder.add_spec_file("suite1", "bar,buzz,buzz", "desc 1d", suite1_buzz()?)?;
    builder.add_spec_file("suite1", "baz", "desc 1e", suite1_baz()?)?;

    builder.add_readme("suite2", "", "desc 2a")?;
    builder.add_spec_file("suite2", "foof", "desc 2b", suite2_foof()?)?;

    builder.add_spec_file("s", "g", "", s_g()?)?;

    builder.add_readme("demo", "", "Demonstrates how case bodies end.")?;
    builder.add_readme("demo", "api", "API-level demos.")?;
    builder.add_spec_file("demo", "api,outcomes", "Every outcome a body can have.", demo_outcomes()?)?;
    builder.add_spec_file("demo", "api,subcases", "Cases split into subcases.", demo_subcases()?)?;
    builder.add_spec_file("demo", "api,device", "Tests that need a device.", demo_device()?)?;

    Ok(builder.build())
}

fn suite1_foo() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    for name in ["hello", "bonjour", "hola"] {
        g.test(name).body(|_| async { Ok(()) })?;
    }
    Ok(g)
}

fn suite1_buzz() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("zap").body(|_| async { Ok(()) })?;
    Ok(g)
}

fn suite1_baz() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("wye")
        .params(vec![CaseParams::new(), CaseParams::new().with("x", 1)])
        .body(|_| async { Ok(()) })?;
    g.test("zed")
        .params(vec![
            CaseParams::new().with("a", 1).with("b", 2).with("_c", 0),
            CaseParams::new().with("b", 3).with("a", 1).with("_c", 0),
        ])
        .body(|_| async { Ok(()) })?;
    Ok(g)
}

fn suite2_foof() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("blah").body(|ctx| async move {
        ctx.debug("OK");
        Ok(())
    })?;
    g.test("bleh")
        .params(vec![CaseParams::new().with("a", 1)])
        .body(|ctx| async move {
            ctx.debug("OK");
            ctx.debug("OK");
            Ok(())
        })?;
    g.test("bluh,a").body(|ctx| async move {
        ctx.fail("bye");
        Ok(())
    })?;
    Ok(g)
}

fn s_g() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("t")
        .desc("Passes for x=1 and fails for x=2.")
        .params(params().combine(poptions("x", [1, 2])))
        .body(|ctx| async move {
            let x = ctx.param("x").and_then(|x| x.as_u64());
            ctx.expect(x != Some(2), "x is 2");
            Ok(())
        })?;
    Ok(g)
}

fn demo_outcomes() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("passes").body(|ctx| async move {
        ctx.info("nothing to see here");
        Ok(())
    })?;
    g.test("warns")
        .desc("Finishes with a warning, which is worse than a pass but not a failure.")
        .body(|ctx| async move {
            ctx.warn("used a deprecated code path");
            Ok(())
        })?;
    g.test("skips").body(|ctx| async move { Err(ctx.skip("not supported here")) })?;
    g.test("errors").body(|_| async {
        Err(CaseError::from_error(
            "failed to read expected data",
            std::io::Error::other("file is empty"),
        ))
    })?;
    g.test("panics")
        .body(|_| async { panic!("reached an unreachable state") })?;
    g.test("eventual")
        .desc("Checks a value after the body has returned.")
        .params(pbool("late_failure"))
        .body(|ctx| async move {
            let late_failure = ctx
                .param("late_failure")
                .and_then(|v| v.as_bool())
                .unwrap_or_default();
            let inner = ctx.clone();
            ctx.eventual(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                inner.expect(!late_failure, "value changed after the body returned");
                Ok(())
            });
            Ok(())
        })?;
    Ok(g)
}

fn demo_subcases() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("sizes")
        .params(params().combine(poptions("format", ["r8unorm", "rgba8unorm"])))
        .subcases(params().combine(poptions("size", [1, 4])))
        .body(|ctx| async move {
            let format = ctx.param("format").and_then(|v| v.as_str()).unwrap_or_default();
            let size = ctx.param("size").and_then(|v| v.as_u64()).unwrap_or_default();
            ctx.debug(format!("format {format}, size {size}"));
            if format == "rgba8unorm" && size == 1 {
                ctx.fail_with_detail("size is too small", "rgba8unorm needs at least 4 bytes");
            }
            Ok(())
        })?;
    Ok(g)
}

fn demo_device() -> Result<TestGroup, CatalogError> {
    let mut g = TestGroup::new();
    g.test("adapter")
        .desc("Requests an adapter from the host, and skips when there isn't one.")
        .body(|ctx| async move {
            let adapter = ctx
                .host()
                .request_adapter()
                .map_err(|error| CaseError::skip(error.to_string()))?;
            ctx.info(format!("using adapter {}", adapter.name));
            if adapter.is_fallback {
                ctx.warn("running on a fallback adapter");
            }
            Ok(())
        })?;
    Ok(g)
}

/// Expected outcomes of every case in [`catalog`], in run order, with the default host.
pub static EXPECTED_CASES: &[CaseFixture] = &[
    CaseFixture::new("suite1:foo:hello:;", Status::Pass),
    CaseFixture::new("suite1:foo:bonjour:;", Status::Pass),
    CaseFixture::new("suite1:foo:hola:;", Status::Pass),
    CaseFixture::new("suite1:bar,buzz,buzz:zap:;", Status::Pass),
    CaseFixture::new("suite1:baz:wye:;", Status::Pass),
    CaseFixture::new("suite1:baz:wye:x=1;", Status::Pass),
    CaseFixture::new("suite1:baz:zed:a=1;b=2;", Status::Pass),
    CaseFixture::new("suite1:baz:zed:b=3;a=1;", Status::Pass),
    CaseFixture::new("suite2:foof:blah:;", Status::Pass),
    CaseFixture::new("suite2:foof:bleh:a=1;", Status::Pass),
    CaseFixture::new("suite2:foof:bluh,a:;", Status::Fail),
    CaseFixture::new("s:g:t:x=1;", Status::Pass),
    CaseFixture::new("s:g:t:x=2;", Status::Fail),
    CaseFixture::new("demo:api,outcomes:passes:;", Status::Pass),
    CaseFixture::new("demo:api,outcomes:warns:;", Status::Warn),
    CaseFixture::new("demo:api,outcomes:skips:;", Status::Skip),
    CaseFixture::new("demo:api,outcomes:errors:;", Status::Fail),
    CaseFixture::new("demo:api,outcomes:panics:;", Status::Fail),
    CaseFixture::new("demo:api,outcomes:eventual:late_failure=false;", Status::Pass),
    CaseFixture::new("demo:api,outcomes:eventual:late_failure=true;", Status::Fail),
    CaseFixture::new("demo:api,subcases:sizes:format=\"r8unorm\";", Status::Pass),
    CaseFixture::new("demo:api,subcases:sizes:format=\"rgba8unorm\";", Status::Fail),
    CaseFixture::new("demo:api,device:adapter:;", Status::Skip),
];

/// Returns the expected cases whose names start with `prefix`.
pub fn expected_cases(prefix: &str) -> Vec<CaseFixture> {
    EXPECTED_CASES
        .iter()
        .filter(|case| case.name.starts_with(prefix))
        .copied()
        .collect()
}
