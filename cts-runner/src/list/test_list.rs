// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{OutputFormat, Styles};
use crate::{
    catalog::{Catalog, SpecFile, TestNode},
    errors::{CaseGenerationError, CaseParamsError, NodeGenerationError, WriteTestListError},
    helpers::panic_message,
};
use cts_metadata::{TestCaseSummary, TestListSummary};
use cts_query::{CaseParams, Ordering, TestQuery};
use owo_colors::OwoColorize;
use std::{
    collections::HashSet,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
};
use tracing::debug;

/// Resolves a query against the catalog into the ordered list of cases it contains.
///
/// Spec files are visited in registration order and tests in declaration order. A query that
/// matches nothing resolves to an empty list.
///
/// Every matching test is resolved even if some fail to generate cases. If any failed, the
/// returned error lists all of them.
pub fn load_cases<'a>(
    catalog: &'a Catalog,
    query: &TestQuery,
) -> Result<TestList<'a>, CaseGenerationError> {
    let mut cases = Vec::new();
    let mut errors = Vec::new();

    for spec_file in catalog.spec_files() {
        let file_query =
            TestQuery::multi_test(spec_file.suite(), spec_file.path().to_vec(), Vec::new());
        if !query.compare(&file_query).is_ordered() {
            continue;
        }

        for node in spec_file.group().tests() {
            let test_query = TestQuery::multi_case(
                spec_file.suite(),
                spec_file.path().to_vec(),
                node.path().to_vec(),
                CaseParams::new(),
            );
            if query.compare(&test_query) == Ordering::Unordered {
                continue;
            }

            match load_node(spec_file, node, query) {
                Ok(leaves) => cases.extend(leaves),
                Err(node_errors) => errors.push(NodeGenerationError {
                    test: test_query.to_string(),
                    errors: node_errors,
                }),
            }
        }
    }

    if !errors.is_empty() {
        return Err(CaseGenerationError { errors });
    }

    debug!(query = %query, case_count = cases.len(), "loaded cases");
    Ok(TestList {
        query: query.clone(),
        cases,
    })
}

fn load_node<'a>(
    spec_file: &'a SpecFile,
    node: &'a TestNode,
    query: &TestQuery,
) -> Result<Vec<TestCaseLeaf<'a>>, Vec<CaseParamsError>> {
    // Generators are user code. A panic discards the whole node, like any other generator error.
    let generated = panic::catch_unwind(AssertUnwindSafe(|| {
        node.params().cases().collect::<Vec<_>>()
    }))
    .map_err(|payload| {
        vec![CaseParamsError::GeneratorPanicked {
            message: panic_message(&*payload),
        }]
    })?;

    let mut leaves = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for params in generated {
        let params = match params {
            Ok(params) => params,
            Err(error) => {
                errors.push(error.into());
                continue;
            }
        };

        let public = params.public();
        if !seen.insert(unordered_key(&public)) {
            errors.push(CaseParamsError::DuplicateParams {
                params: public.to_string(),
            });
            continue;
        }

        let case_query = match TestQuery::try_single_case(
            spec_file.suite(),
            spec_file.path(),
            node.path(),
            &params,
        ) {
            Ok(case_query) => case_query,
            Err(error) => {
                errors.push(error.into());
                continue;
            }
        };

        if query.contains(&case_query) {
            leaves.push(TestCaseLeaf {
                query: case_query,
                params,
                spec_file,
                node,
            });
        }
    }

    if errors.is_empty() {
        Ok(leaves)
    } else {
        Err(errors)
    }
}

/// Two public param sets are duplicates if they assign the same values, in any order.
fn unordered_key(public: &CaseParams) -> Vec<(String, String)> {
    let mut key: Vec<_> = public
        .iter()
        .map(|(k, v)| (k.to_owned(), v.to_string()))
        .collect();
    key.sort_unstable();
    key
}

/// The ordered list of cases a query resolved to.
#[derive(Clone, Debug)]
pub struct TestList<'a> {
    query: TestQuery,
    cases: Vec<TestCaseLeaf<'a>>,
}

impl<'a> TestList<'a> {
    /// Returns the query this list was resolved from.
    pub fn query(&self) -> &TestQuery {
        &self.query
    }

    /// Iterates over the cases in execution order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TestCaseLeaf<'a>> + '_ {
        self.cases.iter()
    }

    /// Returns the number of cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if the query matched no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Returns the first case, if any.
    pub fn first(&self) -> Option<&TestCaseLeaf<'a>> {
        self.cases.first()
    }

    /// Returns the canonical name of every case.
    pub fn names(&self) -> Vec<String> {
        self.cases.iter().map(|case| case.query.to_string()).collect()
    }

    /// Constructs a serializable summary for this list.
    pub fn to_summary(&self) -> TestListSummary {
        TestListSummary {
            query: self.query.to_string(),
            case_count: self.cases.len(),
            cases: self.cases.iter().map(TestCaseLeaf::to_summary).collect(),
        }
    }

    /// Outputs this list to the given writer.
    pub fn write(
        &self,
        output_format: OutputFormat,
        writer: impl Write,
        colorize: bool,
    ) -> Result<(), WriteTestListError> {
        match output_format {
            OutputFormat::Human { verbose } => self
                .write_human(writer, verbose, colorize)
                .map_err(WriteTestListError::Io),
            OutputFormat::Serializable(format) => format
                .to_writer(&self.to_summary(), writer)
                .map_err(WriteTestListError::Json),
        }
    }

    fn write_human(&self, mut writer: impl Write, verbose: bool, colorize: bool) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        for case in &self.cases {
            writeln!(writer, "{}", case.query.style(styles.test_name))?;
            if verbose {
                if let Some(description) = case.node.description() {
                    for line in description.lines() {
                        writeln!(writer, "    {}", line.style(styles.description))?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A single resolved case: the unit of execution.
#[derive(Clone, Debug)]
pub struct TestCaseLeaf<'a> {
    query: TestQuery,
    params: CaseParams,
    spec_file: &'a SpecFile,
    node: &'a TestNode,
}

impl<'a> TestCaseLeaf<'a> {
    /// Returns the single-case query naming this case.
    pub fn query(&self) -> &TestQuery {
        &self.query
    }

    /// Returns the canonical name of this case.
    pub fn name(&self) -> String {
        self.query.to_string()
    }

    /// Returns the full params, including private ones.
    pub fn params(&self) -> &CaseParams {
        &self.params
    }

    /// Returns the spec file declaring this case.
    pub fn spec_file(&self) -> &'a SpecFile {
        self.spec_file
    }

    /// Returns the test this case belongs to.
    pub fn node(&self) -> &'a TestNode {
        self.node
    }

    fn to_summary(&self) -> TestCaseSummary {
        TestCaseSummary {
            name: self.query.to_string(),
            suite: self.spec_file.suite().to_owned(),
            file: self.spec_file.path().to_vec(),
            test: self.node.path().to_vec(),
            params: self
                .params
                .public()
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_owned(),
                        serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
                    )
                })
                .collect(),
            description: self.node.description().map(ToOwned::to_owned),
        }
    }
}
