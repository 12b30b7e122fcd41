// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{CaseParams, ParamValue, TestQuery};
use proptest::{collection::vec, prelude::*};

fn query_part_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,5}"
}

fn path_strategy(min: usize) -> impl Strategy<Value = Vec<String>> {
    vec(query_part_strategy(), min..4)
}

impl ParamValue {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        prop_oneof![
            1 => Just(Self::Undefined),
            1 => Just(Self::Null),
            2 => any::<bool>().prop_map(Self::Bool),
            4 => any::<i64>().prop_map(|n| Self::Number(n.into())),
            // Strings avoid the characters reserved by the query grammar.
            4 => "[a-zA-Z0-9 :,._\"\\\\-]{0,8}".prop_map(Self::String),
        ]
    }
}

impl CaseParams {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        vec((query_part_strategy(), ParamValue::strategy()), 0..4)
            .prop_map(|entries| entries.into_iter().collect())
    }
}

impl TestQuery {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        prop_oneof![
            1 => (query_part_strategy(), path_strategy(0))
                .prop_map(|(suite, file)| Self::multi_file(suite, file)),
            1 => (query_part_strategy(), path_strategy(1), path_strategy(0))
                .prop_map(|(suite, file, test)| Self::multi_test(suite, file, test)),
            2 => (query_part_strategy(), path_strategy(1), path_strategy(1), CaseParams::strategy())
                .prop_map(|(suite, file, test, params)| Self::multi_case(suite, file, test, params)),
            2 => (query_part_strategy(), path_strategy(1), path_strategy(1), CaseParams::strategy())
                .prop_map(|(suite, file, test, params)| Self::single_case(suite, file, test, params)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn query_roundtrip(#[strategy(TestQuery::strategy())] query: TestQuery) {
        let query_string = query.to_string();
        let parsed = TestQuery::parse(&query_string)
            .unwrap_or_else(|err| panic!("{query_string} failed to parse: {err:?}"));
        prop_assert_eq!(query, parsed, "queries must roundtrip");
    }

    #[proptest]
    fn contains_is_reflexive(#[strategy(TestQuery::strategy())] query: TestQuery) {
        prop_assert!(query.contains(&query));
    }

    #[proptest]
    fn single_case_in_its_multi_case(
        #[strategy(TestQuery::strategy())] query: TestQuery,
    ) {
        if let TestQuery::SingleCase {
            suite,
            file,
            test,
            params,
        } = &query
        {
            let test_level =
                TestQuery::multi_case(suite.clone(), file.clone(), test.clone(), CaseParams::new());
            let file_level = TestQuery::multi_test(suite.clone(), file.clone(), vec![]);
            let suite_level = TestQuery::multi_file(suite.clone(), vec![]);
            prop_assert!(test_level.contains(&query));
            prop_assert!(file_level.contains(&test_level));
            prop_assert!(suite_level.contains(&file_level));
            prop_assert!(suite_level.contains(&query));
            if !params.is_empty() {
                prop_assert!(!query.contains(&test_level));
            }
        }
    }
}
