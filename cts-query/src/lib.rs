// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test queries for the CTS runner.
//!
//! A [`TestQuery`] selects a set of test cases in a suite, at file, test or case granularity.
//! Queries are parsed from their string form with [`TestQuery::parse`] and compared with
//! [`compare_queries`] to decide containment.

mod compare;
pub mod errors;
mod params;
mod parsing;
#[cfg(any(test, feature = "internal-testing"))]
mod proptest_helpers;
mod query;

pub use compare::{Ordering, compare_queries};
pub use params::{CaseParams, ParamValue, is_public_key};
pub use query::{
    BIG_SEPARATOR, PARAM_KV_SEPARATOR, PARAM_SEPARATOR, PATH_SEPARATOR, QueryLevel, TestQuery,
    WILDCARD, is_valid_query_part,
};
