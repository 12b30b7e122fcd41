// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ParamMergeError;
use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use smol_str::SmolStr;
use std::fmt;

/// A single parameter value.
///
/// Only scalar JSON values can be expressed in a query, plus `undefined` for parameters that are
/// present but unset.
///
/// Numbers compare by value: `1`, `1.0` and `1e0` are the same value, and display as `1`.
#[derive(Clone, Debug)]
pub enum ParamValue {
    /// The reserved `undefined` token.
    Undefined,
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(serde_json::Number),
    /// A string.
    String(String),
}

impl ParamValue {
    /// Converts a JSON value into a parameter value.
    ///
    /// Returns `None` for arrays and objects.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(b)),
            serde_json::Value::Number(n) => Some(Self::Number(normalize_number(n))),
            serde_json::Value::String(s) => Some(Self::String(s)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an `i64`, if this is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as a `u64`, if this is a non-negative integer that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns the value as an `f64`, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this is the `undefined` value.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => numbers_equal(a, b),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

// Numbers are always finite, so equality is reflexive.
impl Eq for ParamValue {}

/// The largest integer an `f64` represents exactly, along with every integer below it.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Rewrites a float with no fractional part as an integer.
fn normalize_number(n: serde_json::Number) -> serde_json::Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            if f < 0.0 {
                (f as i64).into()
            } else {
                (f as u64).into()
            }
        }
        _ => n,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if a.is_f64() || b.is_f64() {
        a.as_f64() == b.as_f64()
    } else {
        a == b
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", normalize_number(n.clone())),
            // serde_json's Display for Value produces a quoted, escaped string.
            Self::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => normalize_number(n.clone()).serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::Number(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        // Non-finite numbers have no JSON representation and serialize as null.
        serde_json::Number::from_f64(value)
            .map_or(Self::Null, |n| Self::Number(normalize_number(n)))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

/// Returns true if a parameter with this key is public, i.e. can appear in queries.
pub fn is_public_key(key: &str) -> bool {
    !key.starts_with('_')
}

/// An insertion-ordered set of parameter assignments for one test case.
///
/// Keys starting with `_` are private: test bodies see them, but they never appear in queries.
///
/// Equality ignores ordering. Order still matters for display and for query prefix matching.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseParams {
    entries: IndexMap<SmolStr, ParamValue>,
}

impl CaseParams {
    /// Creates an empty set of params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key-value pair, returning `self`.
    pub fn with(mut self, key: impl Into<SmolStr>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a key-value pair, returning the previous value if the key was already present.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(
        &mut self,
        key: impl Into<SmolStr>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &ParamValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns only the public entries, in order.
    pub fn public(&self) -> CaseParams {
        self.iter()
            .filter(|(k, _)| is_public_key(k))
            .map(|(k, v)| (k, v.clone()))
            .collect()
    }

    /// Returns true if any entry is private.
    pub fn has_private(&self) -> bool {
        self.entries.keys().any(|k| !is_public_key(k))
    }

    /// Merges `other` after `self`.
    ///
    /// Fails if a key appears on both sides.
    pub fn merge(&self, other: &CaseParams) -> Result<CaseParams, ParamMergeError> {
        let mut merged = self.clone();
        for (key, value) in &other.entries {
            if merged.entries.contains_key(key) {
                return Err(ParamMergeError {
                    key: key.to_string(),
                });
            }
            merged.entries.insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    /// Returns true if `prefix` is an ordered prefix of `self`, comparing keys and values.
    pub fn starts_with(&self, prefix: &CaseParams) -> bool {
        prefix.len() <= self.len() && self.iter().zip(prefix.iter()).all(|(a, b)| a == b)
    }
}

impl<K, V> FromIterator<(K, V)> for CaseParams
where
    K: Into<SmolStr>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<'a> IntoIterator for &'a CaseParams {
    type Item = (&'a SmolStr, &'a ParamValue);
    type IntoIter = indexmap::map::Iter<'a, SmolStr, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Displays each entry as `key=value;`.
impl fmt::Display for CaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            write!(f, "{k}={v};")?;
        }
        Ok(())
    }
}

impl Serialize for CaseParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
