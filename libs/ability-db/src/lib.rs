#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Storage adapter for compiled access scopes.
//!
//! Renders an [`AccessScope`](ability_security::AccessScope) into a `SeaORM`
//! [`Condition`](sea_orm::Condition). Executing the query stays with the caller.

pub mod secure;

pub use secure::{ScopableEntity, build_scope_condition};
