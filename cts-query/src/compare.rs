// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{params::CaseParams, query::TestQuery};

/// The relationship between the case sets selected by two queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ordering {
    /// Neither query contains the other.
    Unordered,
    /// The first query selects strictly more than the second.
    StrictSuperset,
    /// Both queries select the same cases.
    Equal,
    /// The first query selects strictly less than the second.
    StrictSubset,
}

impl Ordering {
    /// Returns true if either query contains the other.
    pub fn is_ordered(self) -> bool {
        self != Self::Unordered
    }
}

/// Compares two queries.
///
/// Suites must match exactly. Then the file paths, test paths and params are compared level by
/// level. A query that ends above a level (is "big" relative to it) can contain queries that go
/// further down.
pub fn compare_queries(a: &TestQuery, b: &TestQuery) -> Ordering {
    if a.suite() != b.suite() {
        return Ordering::Unordered;
    }

    if let Some(ordering) = cmp_level(
        compare_paths(a.file(), b.file()),
        a.test().is_none(),
        b.test().is_none(),
    ) {
        return ordering;
    }

    let (Some(a_test), Some(b_test)) = (a.test(), b.test()) else {
        // cmp_level always returns Some if either side is big.
        return Ordering::Unordered;
    };
    if let Some(ordering) = cmp_level(
        compare_paths(a_test, b_test),
        a.params().is_none(),
        b.params().is_none(),
    ) {
        return ordering;
    }

    let (Some(a_params), Some(b_params)) = (a.params(), b.params()) else {
        return Ordering::Unordered;
    };
    cmp_level(
        compare_params(a_params, b_params),
        a.ends_with_wildcard(),
        b.ends_with_wildcard(),
    )
    .unwrap_or(Ordering::Equal)
}

/// Compares one level of two queries.
///
/// Returns `None` if both queries are equal at this level and continue further down.
fn cmp_level(ordering: Ordering, a_is_big: bool, b_is_big: bool) -> Option<Ordering> {
    if !a_is_big && !b_is_big {
        return (ordering != Ordering::Equal).then_some(Ordering::Unordered);
    }
    match ordering {
        Ordering::Unordered => Some(Ordering::Unordered),
        Ordering::StrictSuperset => Some(if a_is_big || !b_is_big {
            Ordering::StrictSuperset
        } else {
            Ordering::Unordered
        }),
        Ordering::StrictSubset => Some(if !a_is_big || b_is_big {
            Ordering::StrictSubset
        } else {
            Ordering::Unordered
        }),
        Ordering::Equal => match (a_is_big, b_is_big) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::StrictSuperset),
            (false, true) => Some(Ordering::StrictSubset),
            (false, false) => None,
        },
    }
}

fn compare_paths(a: &[String], b: &[String]) -> Ordering {
    if a.iter().zip(b).any(|(x, y)| x != y) {
        return Ordering::Unordered;
    }
    prefix_ordering(a.len(), b.len())
}

fn compare_params(a: &CaseParams, b: &CaseParams) -> Ordering {
    let a = a.public();
    let b = b.public();
    if a.iter().zip(b.iter()).any(|(x, y)| x != y) {
        return Ordering::Unordered;
    }
    prefix_ordering(a.len(), b.len())
}

fn prefix_ordering(a_len: usize, b_len: usize) -> Ordering {
    match a_len.cmp(&b_len) {
        std::cmp::Ordering::Equal => Ordering::Equal,
        std::cmp::Ordering::Less => Ordering::StrictSuperset,
        std::cmp::Ordering::Greater => Ordering::StrictSubset,
    }
}
