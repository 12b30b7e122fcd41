// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Machine-readable summary of the cases a query resolved to.
///
/// Produced by `cts list --message-format json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestListSummary {
    /// The query, in canonical form.
    pub query: String,

    /// The number of cases.
    pub case_count: usize,

    /// The cases, in execution order.
    pub cases: Vec<TestCaseSummary>,
}

impl TestListSummary {
    /// Parses JSON output produced by `cts list --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }
}

/// Machine-readable information about a single case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSummary {
    /// The canonical single-case query.
    pub name: String,

    /// The suite the case belongs to.
    pub suite: String,

    /// The path of the spec file within the suite.
    pub file: Vec<String>,

    /// The path of the test within the spec file.
    pub test: Vec<String>,

    /// The public params of the case, in order. `undefined` values are `null`.
    pub params: Vec<(String, serde_json::Value)>,

    /// The description of the test, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_summary_roundtrip() {
        let summary = TestListSummary {
            query: "s:g:t:*".to_owned(),
            case_count: 1,
            cases: vec![TestCaseSummary {
                name: "s:g:t:x=1;".to_owned(),
                suite: "s".to_owned(),
                file: vec!["g".to_owned()],
                test: vec!["t".to_owned()],
                params: vec![("x".to_owned(), serde_json::json!(1))],
                description: None,
            }],
        };
        let json = serde_json::to_string(&summary).expect("serializes");
        assert!(json.contains("\"case-count\":1"), "{json}");
        assert_eq!(TestListSummary::parse_json(&json).expect("roundtrips"), summary);
    }
}
