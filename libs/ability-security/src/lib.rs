#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Compiled access predicates.
//!
//! The rule engine compiles grants into an [`AccessScope`]; storage adapters
//! translate it into their own filter language. The scope can also be
//! evaluated in memory against any [`ScopedRecord`].

pub mod access_scope;
pub mod value;

pub use access_scope::{
    AccessScope, FilterOp, ScopeConstraint, ScopeFilter, ScopedRecord, properties,
};
pub use value::ScopeValue;
