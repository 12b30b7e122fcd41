// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for the parameter sets a test runs over.
//!
//! A [`CaseParamsSource`] produces a finite, deterministic sequence of [`CaseParams`]. Sources
//! are restartable: every call to [`CaseParamsSource::cases`] starts from the beginning.
//!
//! ```
//! use cts_runner::params::{CaseParamsSource, params, pbool, poptions};
//!
//! let source = params()
//!     .combine(poptions("x", [1, 2]))
//!     .combine(pbool("flag"))
//!     .unless(|p| p.get("x").and_then(|x| x.as_u64()) == Some(2));
//! let cases: Vec<String> = source.cases().map(|c| c.unwrap().to_string()).collect();
//! assert_eq!(cases, ["x=1;flag=false;", "x=1;flag=true;"]);
//! ```

use crate::errors::ParamsError;
use cts_query::{CaseParams, ParamValue};
use smol_str::SmolStr;
use std::{iter, sync::Arc};

/// An iterator over the cases produced by a [`CaseParamsSource`].
pub type CaseParamsIter<'a> = Box<dyn Iterator<Item = Result<CaseParams, ParamsError>> + 'a>;

/// A restartable source of case parameters.
pub trait CaseParamsSource: Send + Sync {
    /// Returns the cases from the beginning.
    fn cases(&self) -> CaseParamsIter<'_>;
}

impl CaseParamsSource for Vec<CaseParams> {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(self.iter().cloned().map(Ok))
    }
}

impl CaseParamsSource for Vec<Result<CaseParams, ParamsError>> {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(self.iter().cloned())
    }
}

impl<T: CaseParamsSource + ?Sized> CaseParamsSource for Box<T> {
    fn cases(&self) -> CaseParamsIter<'_> {
        (**self).cases()
    }
}

impl<T: CaseParamsSource + ?Sized> CaseParamsSource for Arc<T> {
    fn cases(&self) -> CaseParamsIter<'_> {
        (**self).cases()
    }
}

/// A single key with a list of values, one case per value.
#[derive(Clone, Debug)]
pub struct POptions {
    name: SmolStr,
    values: Vec<ParamValue>,
}

impl CaseParamsSource for POptions {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(
            self.values
                .iter()
                .map(|value| Ok(CaseParams::new().with(self.name.clone(), value.clone()))),
        )
    }
}

/// Returns a source with one case per value, each assigning `name`.
pub fn poptions<V: Into<ParamValue>>(
    name: impl Into<SmolStr>,
    values: impl IntoIterator<Item = V>,
) -> POptions {
    POptions {
        name: name.into(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

/// Returns a source assigning `name` to `false`, then `true`.
pub fn pbool(name: impl Into<SmolStr>) -> POptions {
    poptions(name, [false, true])
}

/// Returns a builder producing a single empty case.
pub fn params() -> ParamsBuilder {
    ParamsBuilder {
        source: Box::new(vec![CaseParams::new()]),
    }
}

/// A chainable builder over a params source.
///
/// Each method wraps the current source, so the resulting sequence is evaluated lazily on every
/// call to [`CaseParamsSource::cases`].
pub struct ParamsBuilder {
    source: Box<dyn CaseParamsSource>,
}

impl ParamsBuilder {
    /// Takes the cartesian product with `other`.
    ///
    /// Every combined case is the current case followed by the other case. A key present on both
    /// sides is an error for that case.
    pub fn combine(self, other: impl CaseParamsSource + 'static) -> Self {
        Self::wrapped(Combine {
            outer: self.source,
            inner: Box::new(other),
        })
    }

    /// Expands every case with the cases returned by `f`.
    ///
    /// Unlike [`combine`](Self::combine), the expansion can depend on the case being expanded.
    pub fn expand<F, S>(self, f: F) -> Self
    where
        F: Fn(&CaseParams) -> S + Send + Sync + 'static,
        S: CaseParamsSource + 'static,
    {
        Self::wrapped(Expand {
            source: self.source,
            expand: Box::new(move |case: &CaseParams| -> Box<dyn CaseParamsSource> {
                Box::new(f(case))
            }),
        })
    }

    /// Keeps only the cases for which `pred` returns true.
    pub fn filter<F>(self, pred: F) -> Self
    where
        F: Fn(&CaseParams) -> bool + Send + Sync + 'static,
    {
        Self::wrapped(Filter {
            source: self.source,
            pred: Box::new(pred),
        })
    }

    /// Drops the cases for which `pred` returns true.
    pub fn unless<F>(self, pred: F) -> Self
    where
        F: Fn(&CaseParams) -> bool + Send + Sync + 'static,
    {
        self.filter(move |case| !pred(case))
    }

    /// Drops the cases whose public params equal any case in `list`.
    pub fn exclude(self, list: impl CaseParamsSource + 'static) -> Self {
        Self::wrapped(Exclude {
            source: self.source,
            excluded: Box::new(list),
        })
    }

    fn wrapped(source: impl CaseParamsSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl CaseParamsSource for ParamsBuilder {
    fn cases(&self) -> CaseParamsIter<'_> {
        self.source.cases()
    }
}

struct Combine {
    outer: Box<dyn CaseParamsSource>,
    inner: Box<dyn CaseParamsSource>,
}

impl CaseParamsSource for Combine {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(self.outer.cases().flat_map(move |outer| match outer {
            Ok(outer) => Box::new(self.inner.cases().map(
                move |inner| -> Result<CaseParams, ParamsError> {
                    let inner = inner?;
                    Ok(outer.merge(&inner)?)
                },
            )) as CaseParamsIter<'_>,
            Err(error) => Box::new(iter::once(Err(error))),
        }))
    }
}

type ExpandFn = Box<dyn Fn(&CaseParams) -> Box<dyn CaseParamsSource> + Send + Sync>;

struct Expand {
    source: Box<dyn CaseParamsSource>,
    expand: ExpandFn,
}

impl CaseParamsSource for Expand {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(self.source.cases().flat_map(move |case| match case {
            Ok(case) => {
                let expanded = (self.expand)(&case);
                // The expanded source is owned by this iterator, so collect its cases eagerly.
                let merged: Vec<_> = expanded
                    .cases()
                    .map(|sub| -> Result<CaseParams, ParamsError> { Ok(case.merge(&sub?)?) })
                    .collect();
                Box::new(merged.into_iter()) as CaseParamsIter<'_>
            }
            Err(error) => Box::new(iter::once(Err(error))),
        }))
    }
}

type FilterFn = Box<dyn Fn(&CaseParams) -> bool + Send + Sync>;

struct Filter {
    source: Box<dyn CaseParamsSource>,
    pred: FilterFn,
}

impl CaseParamsSource for Filter {
    fn cases(&self) -> CaseParamsIter<'_> {
        Box::new(self.source.cases().filter(move |case| match case {
            Ok(case) => (self.pred)(case),
            Err(_) => true,
        }))
    }
}

struct Exclude {
    source: Box<dyn CaseParamsSource>,
    excluded: Box<dyn CaseParamsSource>,
}

impl CaseParamsSource for Exclude {
    fn cases(&self) -> CaseParamsIter<'_> {
        let excluded = match self
            .excluded
            .cases()
            .map(|case| case.map(|case| case.public()))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(excluded) => excluded,
            Err(error) => return Box::new(iter::once(Err(error))),
        };
        Box::new(self.source.cases().filter(move |case| match case {
            Ok(case) => {
                let public = case.public();
                !excluded.contains(&public)
            }
            Err(_) => true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{collection::vec, prelude::*};
    use test_strategy::proptest;

    fn strings(source: &dyn CaseParamsSource) -> Vec<String> {
        source
            .cases()
            .map(|case| case.expect("case is valid").to_string())
            .collect()
    }

    #[test]
    fn empty_builder_has_one_case() {
        assert_eq!(strings(&params()), vec![""]);
    }

    #[test]
    fn combine_is_cartesian_in_order() {
        let source = params()
            .combine(poptions("x", [1, 2]))
            .combine(poptions("y", ["a", "b"]));
        assert_eq!(
            strings(&source),
            vec![
                r#"x=1;y="a";"#,
                r#"x=1;y="b";"#,
                r#"x=2;y="a";"#,
                r#"x=2;y="b";"#,
            ]
        );
    }

    #[test]
    fn combine_rejects_duplicate_keys() {
        let source = params()
            .combine(poptions("x", [1]))
            .combine(poptions("x", [2]));
        let cases: Vec<_> = source.cases().collect();
        assert_eq!(cases.len(), 1);
        let err = cases[0].clone().expect_err("duplicate key");
        assert!(
            matches!(&err, ParamsError::Merge(merge) if merge.key == "x"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn expand_depends_on_case() {
        let source = params()
            .combine(poptions("n", [1u32, 2]))
            .expand(|case| {
                let n = case.get("n").and_then(|n| n.as_u64()).unwrap_or(0);
                poptions("i", 0..n)
            });
        assert_eq!(strings(&source), vec!["n=1;i=0;", "n=2;i=0;", "n=2;i=1;"]);
    }

    #[test]
    fn filter_and_unless() {
        let base = || params().combine(poptions("x", [1, 2, 3]));
        let is_two = |case: &CaseParams| case.get("x").and_then(|x| x.as_u64()) == Some(2);
        assert_eq!(strings(&base().filter(is_two)), vec!["x=2;"]);
        assert_eq!(strings(&base().unless(is_two)), vec!["x=1;", "x=3;"]);
    }

    #[test]
    fn exclude_matches_public_params() {
        let source = params()
            .combine(poptions("x", [1, 2]))
            .combine(poptions("_private", [true]))
            .exclude(vec![CaseParams::new().with("x", 2)]);
        assert_eq!(strings(&source), vec!["x=1;_private=true;"]);
    }

    #[test]
    fn sources_are_restartable() {
        let source = params().combine(pbool("b"));
        let first = strings(&source);
        let second = strings(&source);
        assert_eq!(first, vec!["b=false;", "b=true;"]);
        assert_eq!(first, second);
    }

    #[test]
    fn generator_errors_pass_through() {
        let source = params().combine(vec![
            Ok(CaseParams::new().with("x", 1)),
            Err(ParamsError::generator("bad")),
        ]);
        let cases: Vec<_> = source.cases().collect();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1], Err(ParamsError::generator("bad")));
    }

    #[proptest]
    fn combine_counts_multiply(
        #[strategy(vec(any::<u64>(), 0..5))] xs: Vec<u64>,
        #[strategy(vec(any::<bool>(), 0..3))] ys: Vec<bool>,
    ) {
        let source = params()
            .combine(poptions("x", xs.clone()))
            .combine(poptions("y", ys.clone()));
        let cases = source
            .cases()
            .collect::<Result<Vec<_>, _>>()
            .expect("keys are distinct");
        prop_assert_eq!(cases.len(), xs.len() * ys.len());
        prop_assert!(cases.iter().all(|case| case.len() == 2));
    }

    #[proptest]
    fn unless_drops_matching_cases(#[strategy(vec(any::<u32>(), 0..8))] xs: Vec<u32>) {
        let odd = xs.iter().filter(|x| *x % 2 == 1).count();
        let source = params()
            .combine(poptions("x", xs))
            .unless(|p| p.get("x").and_then(|x| x.as_u64()).is_some_and(|x| x % 2 == 0));
        prop_assert_eq!(source.cases().count(), odd);
    }

    #[proptest]
    fn excluding_a_case_removes_it(#[strategy(CaseParams::strategy())] case: CaseParams) {
        let source = params()
            .combine(vec![case.clone()])
            .exclude(vec![case]);
        prop_assert_eq!(source.cases().count(), 0);
    }
}
