#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Ability engine
//!
//! Authorization rules for records stored with single-table inheritance:
//!
//! - [`TypeHierarchy`] - supertype/subtype forest sharing one discriminator
//! - [`RuleStore`] - grants registered for one principal
//! - [`compiler::compile`] - grants → [`AccessScope`] for a target type
//! - [`ActionAliases`] - `read` covers `index`/`show`, `manage` covers everything
//! - [`AbilityConfig`] - YAML configuration of types and aliases
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use ability::{Conditions, RuleStore, TypeHierarchy, actions};
//! use uuid::Uuid;
//!
//! let hierarchy = Arc::new(
//!     TypeHierarchy::builder("type")
//!         .root("BaseClass")
//!         .subtype("SubClassA", "BaseClass")
//!         .subtype("SubClassB", "BaseClass")
//!         .build()?,
//! );
//!
//! let mut ability = RuleStore::new(Uuid::nil(), Arc::clone(&hierarchy));
//! ability.grant(actions::READ, "BaseClass", Conditions::new().with("type", "SubClassA"))?;
//! ability.grant(actions::READ, "SubClassB", Conditions::new())?;
//!
//! // Hand the scope to the storage layer.
//! let scope = ability.accessible_scope(actions::READ, "BaseClass")?;
//! assert_eq!(scope.constraints().len(), 2);
//! # Ok::<(), ability::AbilityError>(())
//! ```

pub mod actions;
pub mod compiler;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod rule;
pub mod store;

pub use ability_security::{AccessScope, ScopeValue, ScopedRecord};
pub use actions::ActionAliases;
pub use compiler::compile;
pub use config::{AbilityConfig, TypeConfig};
pub use error::{AbilityError, Result};
pub use hierarchy::{TypeHierarchy, TypeHierarchyBuilder, TypeRef};
pub use rule::{ConditionValue, Conditions, FieldCondition, Rule, RuleSubject};
pub use store::RuleStore;
