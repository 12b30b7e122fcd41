// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The catalog of spec files and the tests they declare.
//!
//! A [`Catalog`] is built once with a [`CatalogBuilder`] and is read-only afterwards. Each spec
//! file owns a [`TestGroup`], which declares tests with [`TestGroup::test`]:
//!
//! ```
//! use cts_runner::{
//!     catalog::{Catalog, TestGroup},
//!     params::{params, poptions},
//! };
//!
//! let mut g = TestGroup::new();
//! g.test("basic")
//!     .desc("Checks that small numbers are small.")
//!     .params(params().combine(poptions("x", [1, 2])))
//!     .body(|ctx| async move {
//!         let x = ctx.param("x").and_then(|x| x.as_u64()).unwrap_or_default();
//!         ctx.expect(x < 10, "x is small");
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let mut builder = Catalog::builder();
//! builder.add_spec_file("demo", "numbers", "Number tests.", g).unwrap();
//! let catalog = builder.build();
//! assert_eq!(catalog.spec_files().len(), 1);
//! ```

use crate::{
    errors::CatalogError,
    params::CaseParamsSource,
    runner::{CaseContext, CaseError},
};
use cts_query::{PATH_SEPARATOR, is_valid_query_part};
use debug_ignore::DebugIgnore;
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::{collections::HashSet, future::Future, sync::Arc};

/// The boxed form of a test body.
pub type CaseFn = Arc<dyn Fn(CaseContext) -> BoxFuture<'static, Result<(), CaseError>> + Send + Sync>;

/// A catalog of spec files, in registration order.
#[derive(Debug, Default)]
pub struct Catalog {
    spec_files: Vec<SpecFile>,
    readmes: Vec<Readme>,
}

impl Catalog {
    /// Returns a builder for a new catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Returns the spec files in registration order.
    pub fn spec_files(&self) -> &[SpecFile] {
        &self.spec_files
    }

    /// Returns the directory descriptions in registration order.
    pub fn readmes(&self) -> &[Readme] {
        &self.readmes
    }

    /// Returns the distinct suite names, in registration order.
    pub fn suites(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.readmes
            .iter()
            .map(|readme| readme.suite.as_str())
            .chain(self.spec_files.iter().map(|file| file.suite.as_str()))
            .filter(|suite| seen.insert(*suite))
            .collect()
    }
}

/// Builds a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    spec_files: IndexMap<(String, Vec<String>), SpecFile>,
    readmes: Vec<Readme>,
}

impl CatalogBuilder {
    /// Registers a spec file.
    ///
    /// `path` is the file path within the suite, with parts separated by `,`. An empty
    /// description is treated as missing.
    pub fn add_spec_file(
        &mut self,
        suite: &str,
        path: &str,
        description: &str,
        group: TestGroup,
    ) -> Result<&mut Self, CatalogError> {
        validate_suite(suite)?;
        let path = split_path("file path", path)?;
        let key = (suite.to_owned(), path.clone());
        if self.spec_files.contains_key(&key) {
            return Err(CatalogError::DuplicateSpecFile {
                suite: suite.to_owned(),
                path: path.join(","),
            });
        }
        self.spec_files.insert(
            key,
            SpecFile {
                suite: suite.to_owned(),
                path,
                description: non_empty(description),
                group,
            },
        );
        Ok(self)
    }

    /// Registers a description for a directory, or for the whole suite if `path` is empty.
    pub fn add_readme(
        &mut self,
        suite: &str,
        path: &str,
        description: &str,
    ) -> Result<&mut Self, CatalogError> {
        validate_suite(suite)?;
        let path = if path.is_empty() {
            Vec::new()
        } else {
            split_path("directory path", path)?
        };
        self.readmes.push(Readme {
            suite: suite.to_owned(),
            path,
            description: description.trim().to_owned(),
        });
        Ok(self)
    }

    /// Builds the catalog.
    pub fn build(self) -> Catalog {
        Catalog {
            spec_files: self.spec_files.into_values().collect(),
            readmes: self.readmes,
        }
    }
}

/// A description attached to a directory (or a whole suite) rather than a spec file.
#[derive(Clone, Debug)]
pub struct Readme {
    /// The suite name.
    pub suite: String,
    /// The directory path. Empty for the suite itself.
    pub path: Vec<String>,
    /// The description.
    pub description: String,
}

/// A single spec file: a path within a suite and the tests it declares.
#[derive(Debug)]
pub struct SpecFile {
    suite: String,
    path: Vec<String>,
    description: Option<String>,
    group: TestGroup,
}

impl SpecFile {
    /// Returns the suite name.
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Returns the file path within the suite.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the tests declared in this file.
    pub fn group(&self) -> &TestGroup {
        &self.group
    }
}

/// The tests declared by one spec file, in declaration order.
#[derive(Debug, Default)]
pub struct TestGroup {
    tests: Vec<TestNode>,
    names: HashSet<Vec<String>>,
}

impl TestGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts declaring a test.
    ///
    /// `name` is a path with parts separated by `,`. Spaces are replaced with `_`. The test is
    /// registered by [`TestBuilder::body`].
    pub fn test(&mut self, name: &str) -> TestBuilder<'_> {
        TestBuilder {
            group: self,
            name: name.replace(' ', "_"),
            description: None,
            params: None,
            subcases: None,
        }
    }

    /// Returns the tests in declaration order.
    pub fn tests(&self) -> &[TestNode] {
        &self.tests
    }
}

/// Declares a single test. Created by [`TestGroup::test`].
#[must_use = "tests are only registered by calling body()"]
pub struct TestBuilder<'g> {
    group: &'g mut TestGroup,
    name: String,
    description: Option<String>,
    params: Option<Arc<dyn CaseParamsSource>>,
    subcases: Option<Arc<dyn CaseParamsSource>>,
}

impl TestBuilder<'_> {
    /// Sets the description of the test.
    pub fn desc(mut self, description: &str) -> Self {
        self.description = non_empty(description);
        self
    }

    /// Sets the source of case params.
    ///
    /// Without params, the test has exactly one case with no params.
    pub fn params(mut self, source: impl CaseParamsSource + 'static) -> Self {
        self.params = Some(Arc::new(source));
        self
    }

    /// Sets the source of subcase params.
    ///
    /// Every case runs the body once per subcase, with the subcase params merged into the case
    /// params. Subcases don't appear in queries.
    pub fn subcases(mut self, source: impl CaseParamsSource + 'static) -> Self {
        self.subcases = Some(Arc::new(source));
        self
    }

    /// Sets the body and registers the test.
    pub fn body<F, Fut>(self, body: F) -> Result<(), CatalogError>
    where
        F: Fn(CaseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CaseError>> + Send + 'static,
    {
        let path = split_path("test name", &self.name)?;
        if !self.group.names.insert(path.clone()) {
            return Err(CatalogError::DuplicateTestName { name: self.name });
        }

        let params: Arc<dyn CaseParamsSource> = match self.params {
            Some(params) => params,
            None => Arc::new(vec![cts_query::CaseParams::new()]),
        };
        let body: CaseFn = Arc::new(move |ctx| body(ctx).boxed());
        self.group.tests.push(TestNode {
            path,
            description: self.description,
            params: DebugIgnore(params),
            subcases: self.subcases.map(DebugIgnore),
            body: DebugIgnore(body),
        });
        Ok(())
    }
}

/// A registered test.
#[derive(Debug)]
pub struct TestNode {
    path: Vec<String>,
    description: Option<String>,
    params: DebugIgnore<Arc<dyn CaseParamsSource>>,
    subcases: Option<DebugIgnore<Arc<dyn CaseParamsSource>>>,
    body: DebugIgnore<CaseFn>,
}

impl TestNode {
    /// Returns the test path.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the source of case params.
    pub fn params(&self) -> &dyn CaseParamsSource {
        &**self.params
    }

    /// Returns the source of subcase params, if the test has subcases.
    pub fn subcases(&self) -> Option<&dyn CaseParamsSource> {
        self.subcases.as_ref().map(|subcases| &***subcases)
    }

    pub(crate) fn body(&self) -> &CaseFn {
        &self.body
    }
}

fn validate_suite(suite: &str) -> Result<(), CatalogError> {
    if is_valid_query_part(suite) {
        Ok(())
    } else {
        Err(CatalogError::InvalidSuite {
            suite: suite.to_owned(),
        })
    }
}

fn split_path(what: &'static str, path: &str) -> Result<Vec<String>, CatalogError> {
    if path.is_empty() {
        return Err(CatalogError::EmptyPath { what });
    }
    path.split(PATH_SEPARATOR)
        .map(|part| {
            if is_valid_query_part(part) {
                Ok(part.to_owned())
            } else {
                Err(CatalogError::InvalidPathPart {
                    what,
                    path: path.to_owned(),
                    part: part.to_owned(),
                })
            }
        })
        .collect()
}

fn non_empty(description: &str) -> Option<String> {
    let description = description.trim();
    (!description.is_empty()).then(|| description.to_owned())
}
