// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Styles, load_cases};
use crate::{
    catalog::Catalog,
    errors::{CaseGenerationError, CollapseError},
};
use cts_query::{CaseParams, Ordering, QueryLevel, TestQuery};
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// The cases a query resolved to, arranged as a hierarchy of queries.
///
/// The root is the suite. Below it are directories, spec files, test path prefixes, tests,
/// param prefixes, and finally the cases themselves:
///
/// ```text
/// s:*
///   s:a,*
///     s:a,b:*
///       s:a,b:t,*
///         s:a,b:t:*
///           s:a,b:t:x=1;*
///             s:a,b:t:x=1;
/// ```
#[derive(Clone, Debug)]
pub struct TestTree {
    query: TestQuery,
    root: TreeNode,
}

impl TestTree {
    /// Builds the tree of every case `query` contains.
    pub fn new(catalog: &Catalog, query: &TestQuery) -> Result<Self, CaseGenerationError> {
        let suite = query.suite();
        let mut root = TreeNode::new(TestQuery::multi_file(suite, Vec::new()));
        let list = load_cases(catalog, query)?;

        for spec_file in catalog.spec_files() {
            if spec_file.suite() != suite {
                continue;
            }
            let file = spec_file.path();
            let file_query = TestQuery::multi_test(suite, file.to_vec(), Vec::new());
            if !query.compare(&file_query).is_ordered() {
                continue;
            }
            let file_node = root.insert_file(suite, file);
            file_node.description = spec_file.description().map(ToOwned::to_owned);

            for node in spec_file.group().tests() {
                let test_query = TestQuery::multi_case(
                    suite,
                    file.to_vec(),
                    node.path().to_vec(),
                    CaseParams::new(),
                );
                if !query.compare(&test_query).is_ordered() {
                    continue;
                }
                let test_node = file_node.insert_test(suite, file, node.path());
                test_node.description = node.description().map(ToOwned::to_owned);
            }
        }

        for case in list.iter() {
            let spec_file = case.spec_file();
            root.insert_file(suite, spec_file.path())
                .insert_test(suite, spec_file.path(), case.node().path())
                .insert_case(case.query());
        }

        // Directory descriptions only annotate directories the query reaches.
        for readme in catalog.readmes() {
            if readme.suite != suite {
                continue;
            }
            if readme.path.is_empty() {
                root.description = Some(readme.description.clone());
                continue;
            }
            let dir_query = TestQuery::multi_file(suite, readme.path.clone());
            if query.compare(&dir_query).is_ordered() {
                root.insert_dirs(suite, &readme.path).description =
                    Some(readme.description.clone());
            }
        }

        Ok(Self {
            query: query.clone(),
            root,
        })
    }

    /// Returns the query this tree was built from.
    pub fn query(&self) -> &TestQuery {
        &self.query
    }

    /// Returns the query of every node, depth first, starting with the suite.
    pub fn queries(&self) -> Vec<&TestQuery> {
        let mut queries = Vec::new();
        self.root.visit(&mut |node| queries.push(&node.query));
        queries
    }

    /// Writes the tree, one node per line, with descriptions.
    pub fn write_to(&self, mut writer: impl Write, colorize: bool) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }
        self.root.write_to(&mut writer, &styles, 0)
    }

    /// Returns the smallest list of queries that covers the tree while keeping every expectation
    /// query separately addressable.
    ///
    /// Directories (and everything above the tree's own query) are always expanded. Below that,
    /// a node stays collapsed unless it strictly contains one of `expectations`. Every expectation
    /// must name a node of the tree exactly.
    pub fn iterate_collapsed<I, S>(&self, expectations: I) -> Result<Vec<TestQuery>, CollapseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let expectations = expectations
            .into_iter()
            .map(|e| TestQuery::parse(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = vec![false; expectations.len()];
        self.root.visit(&mut |node| {
            for (seen, expectation) in seen.iter_mut().zip(&expectations) {
                if node.query.compare(expectation) == Ordering::Equal {
                    *seen = true;
                }
            }
        });
        let unmatched: Vec<_> = expectations
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|(expectation, _)| expectation.to_string())
            .collect();
        if !unmatched.is_empty() {
            return Err(CollapseError::Unmatched { queries: unmatched });
        }

        let expand_through = self.query.level().max(QueryLevel::MultiFile);
        let is_collapsible = |query: &TestQuery| {
            expectations
                .iter()
                .all(|expectation| expectation.compare(query) != Ordering::StrictSubset)
        };

        let mut out = Vec::new();
        self.root
            .collapse_into(&is_collapsible, expand_through, &mut out);
        Ok(out)
    }
}

#[derive(Clone, Debug)]
struct TreeNode {
    query: TestQuery,
    description: Option<String>,
    // Keys end with `,` for path prefixes, `:` for files and tests, and `;` for params, so
    // they never collide. Leaves use the empty key.
    children: IndexMap<String, TreeNode>,
}

impl TreeNode {
    fn new(query: TestQuery) -> Self {
        Self {
            query,
            description: None,
            children: IndexMap::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.query.level() == QueryLevel::SingleCase
    }

    fn child(&mut self, key: String, query: impl FnOnce() -> TestQuery) -> &mut TreeNode {
        self.children
            .entry(key)
            .or_insert_with(|| TreeNode::new(query()))
    }

    /// Inserts the directory nodes for every prefix of `dir`, including `dir` itself.
    fn insert_dirs(&mut self, suite: &str, dir: &[String]) -> &mut TreeNode {
        let mut node = self;
        for (i, part) in dir.iter().enumerate() {
            node = node.child(format!("{part},"), || {
                TestQuery::multi_file(suite, dir[..=i].to_vec())
            });
        }
        node
    }

    /// Inserts the directories above `file`, then the file node itself.
    fn insert_file(&mut self, suite: &str, file: &[String]) -> &mut TreeNode {
        let Some((last, dir)) = file.split_last() else {
            return self;
        };
        self.insert_dirs(suite, dir).child(format!("{last}:"), || {
            TestQuery::multi_test(suite, file.to_vec(), Vec::new())
        })
    }

    fn insert_test(&mut self, suite: &str, file: &[String], test: &[String]) -> &mut TreeNode {
        let mut node = self;
        for (i, part) in test.iter().enumerate() {
            node = node.child(format!("{part},"), || {
                TestQuery::multi_test(suite, file.to_vec(), test[..=i].to_vec())
            });
        }
        let Some(last) = test.last() else {
            return node;
        };
        node.child(format!("{last}:"), || {
            TestQuery::multi_case(suite, file.to_vec(), test.to_vec(), CaseParams::new())
        })
    }

    fn insert_case(&mut self, case: &TestQuery) {
        let (Some(test), Some(params)) = (case.test(), case.params()) else {
            return;
        };
        let mut node = self;
        let mut prefix = CaseParams::new();
        for (key, value) in params.iter() {
            prefix.insert(key, value.clone());
            let prefix = prefix.clone();
            node = node.child(format!("{key}={value};"), || {
                TestQuery::multi_case(case.suite(), case.file().to_vec(), test.to_vec(), prefix)
            });
        }
        node.child(String::new(), || case.clone());
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a TreeNode)) {
        f(self);
        for child in self.children.values() {
            child.visit(f);
        }
    }

    fn collapse_into(
        &self,
        is_collapsible: &impl Fn(&TestQuery) -> bool,
        expand_through: QueryLevel,
        out: &mut Vec<TestQuery>,
    ) {
        for child in self.children.values() {
            if child.is_leaf() {
                out.push(child.query.clone());
            } else if child.children.is_empty() {
                // Nothing below this node matched.
                continue;
            } else if is_collapsible(&child.query) && child.query.level() > expand_through {
                out.push(child.query.clone());
            } else {
                child.collapse_into(is_collapsible, expand_through, out);
            }
        }
    }

    fn write_to(&self, writer: &mut dyn Write, styles: &Styles, depth: usize) -> io::Result<()> {
        let style = if depth == 0 {
            styles.suite
        } else if self.query.test().is_none_or(|test| test.is_empty()) {
            styles.file
        } else {
            styles.test_name
        };
        write!(writer, "{:indent$}{}", "", self.query.style(style), indent = depth * 2)?;
        if let Some(description) = self.description.as_deref().and_then(|d| d.lines().next()) {
            write!(writer, "  {}", description.style(styles.description))?;
        }
        writeln!(writer)?;

        for child in self.children.values() {
            child.write_to(writer, styles, depth + 1)?;
        }
        Ok(())
    }
}
