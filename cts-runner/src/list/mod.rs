// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving queries against a catalog.
//!
//! The main data structures in this module are:
//! * [`TestList`], the flat, ordered list of cases a query contains
//! * [`TestTree`], the same cases arranged as a hierarchy of queries

mod output_format;
mod test_list;
mod tree;

pub use output_format::*;
pub use test_list::*;
pub use tree::*;
