//! Access query compiler.
//!
//! Compiles the grants of a [`RuleStore`] into an [`AccessScope`] selecting
//! the rows of a target type (and its subtypes) the principal may act on.
//!
//! ## Compilation
//!
//! | step | result |
//! |------|--------|
//! | candidates | `descendants_inclusive(target)` |
//! | per applicable rule | `granted_types ∩ candidates` |
//! | empty intersection | rule skipped (unrelated branch) |
//! | non-empty | constraint: `discriminator IN (hit)` AND field filters |
//! | no constraints | deny-all (empty accessible set, not an error) |
//!
//! Constraints are OR-ed and never deduplicated. OR is commutative and
//! idempotent, so registration order cannot change the selected rows.

use std::collections::BTreeSet;

use ability_security::{AccessScope, ScopeConstraint, ScopeFilter, ScopeValue};
use tracing::instrument;

use crate::error::{AbilityError, Result};
use crate::hierarchy::{TypeHierarchy, TypeRef};
use crate::rule::Rule;
use crate::store::RuleStore;

/// Compile the rules of `store` applicable to `action` into a predicate over
/// rows of `target` and its subtypes.
///
/// The discriminator filter is always emitted, even when a rule covers every
/// candidate: the storage layer does not narrow a subtype query on its own.
///
/// # Errors
///
/// [`AbilityError::UnknownType`] if `target` does not belong to the store's
/// hierarchy.
#[instrument(level = "debug", skip(store), fields(subject = %store.subject(), rules = store.rules().len()))]
pub fn compile(store: &RuleStore, action: &str, target: TypeRef) -> Result<AccessScope> {
    let hierarchy = store.hierarchy();
    if !hierarchy.contains(target) {
        return Err(AbilityError::unknown_type(format!("{target:?}")));
    }

    let candidates = hierarchy.descendants_inclusive(target);
    let mut constraints = Vec::new();

    for (idx, rule) in store.rules_for(action).enumerate() {
        match compile_rule(hierarchy, rule, &candidates) {
            Some(constraint) => {
                tracing::trace!(rule = idx, action = rule.action(), "rule contributes a constraint");
                constraints.push(constraint);
            }
            None => {
                tracing::trace!(rule = idx, action = rule.action(), "rule targets an unrelated branch");
            }
        }
    }

    let scope = AccessScope::from_constraints(constraints);
    tracing::debug!(
        constraints = scope.constraints().len(),
        types = ?scope.all_values_for(hierarchy.discriminator()),
        "access scope compiled"
    );
    Ok(scope)
}

/// Compile a single rule into one access path.
///
/// Returns `None` if none of the rule's granted types is a candidate.
fn compile_rule(
    hierarchy: &TypeHierarchy,
    rule: &Rule,
    candidates: &BTreeSet<TypeRef>,
) -> Option<ScopeConstraint> {
    let values: Vec<ScopeValue> = rule
        .granted_types()
        .intersection(candidates)
        .filter_map(|ty| hierarchy.discriminator_value(*ty))
        .map(ScopeValue::from)
        .collect();
    if values.is_empty() {
        return None;
    }

    let mut filters = Vec::with_capacity(1 + rule.field_conditions().len());
    filters.push(ScopeFilter::is_in(hierarchy.discriminator(), values));
    filters.extend(
        rule.field_conditions()
            .iter()
            .map(|c| ScopeFilter::is_in(c.field(), c.values().to_vec())),
    );
    Some(ScopeConstraint::new(filters))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use ability_security::{FilterOp, ScopedRecord};
    use tracing_test::traced_test;
    use uuid::Uuid;

    use super::*;
    use crate::actions;
    use crate::rule::Conditions;

    fn hierarchy() -> Arc<TypeHierarchy> {
        Arc::new(
            TypeHierarchy::builder("type")
                .root("BaseClass")
                .subtype("SubClassA", "BaseClass")
                .subtype("SubClassB", "BaseClass")
                .subtype("SubClassA1", "SubClassA")
                .build()
                .unwrap(),
        )
    }

    fn store() -> RuleStore {
        RuleStore::new(Uuid::new_v4(), hierarchy())
    }

    fn rows() -> Vec<BTreeMap<String, ScopeValue>> {
        ["BaseClass", "SubClassA", "SubClassB", "SubClassA1"]
            .into_iter()
            .map(|kind| BTreeMap::from([("type".to_owned(), ScopeValue::from(kind))]))
            .collect()
    }

    fn accessible(store: &RuleStore, target: &str) -> Vec<String> {
        let scope = store.accessible_scope(actions::READ, target).unwrap();
        scope
            .select(&rows())
            .into_iter()
            .filter_map(|r| r.property("type"))
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect()
    }

    #[test]
    fn base_grant_covers_every_subtype() {
        let mut s = store();
        s.grant(actions::READ, "BaseClass", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::READ, "BaseClass").unwrap();
        assert_eq!(scope.constraints().len(), 1);
        let filter = &scope.constraints()[0].filters()[0];
        assert_eq!(filter.property(), "type");
        assert_eq!(*filter.op(), FilterOp::In);
        assert_eq!(
            filter.values(),
            &[
                ScopeValue::from("BaseClass"),
                ScopeValue::from("SubClassA"),
                ScopeValue::from("SubClassB"),
                ScopeValue::from("SubClassA1"),
            ]
        );
    }

    #[test]
    fn base_grant_queried_at_subtype_is_narrowed_to_candidates() {
        let mut s = store();
        s.grant(actions::READ, "BaseClass", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::READ, "SubClassA").unwrap();
        assert_eq!(
            scope.all_values_for("type"),
            vec![ScopeValue::from("SubClassA"), ScopeValue::from("SubClassA1")]
        );
    }

    #[test]
    fn subtype_grant_does_not_leak_to_siblings_or_base() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA1", Conditions::new()).unwrap();

        assert_eq!(accessible(&s, "BaseClass"), ["SubClassA1"]);
        assert_eq!(accessible(&s, "SubClassA"), ["SubClassA1"]);
        assert!(accessible(&s, "SubClassB").is_empty());
    }

    #[test]
    fn field_conditions_are_anded_with_type_filter() {
        let mut s = store();
        s.grant(
            actions::READ,
            "SubClassA",
            Conditions::new().with("owner_id", 9),
        )
        .unwrap();

        let scope = s.accessible_scope(actions::READ, "BaseClass").unwrap();
        let filters = scope.constraints()[0].filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1].property(), "owner_id");
        assert_eq!(filters[1].values(), &[ScopeValue::from(9)]);
    }

    #[test]
    fn other_actions_do_not_contribute() {
        let mut s = store();
        s.grant(actions::UPDATE, "BaseClass", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::READ, "BaseClass").unwrap();
        assert!(scope.is_deny_all());
    }

    #[test]
    fn aliases_and_manage_contribute() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA", Conditions::new()).unwrap();
        s.grant(actions::MANAGE, "SubClassB", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::INDEX, "BaseClass").unwrap();
        assert_eq!(scope.constraints().len(), 2);
    }

    #[test]
    fn overlapping_rules_are_kept() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA", Conditions::new()).unwrap();
        s.grant(actions::READ, "SubClassA", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::READ, "BaseClass").unwrap();
        assert_eq!(scope.constraints().len(), 2);
        assert_eq!(accessible(&s, "BaseClass"), ["SubClassA", "SubClassA1"]);
    }

    #[test]
    fn foreign_target_is_an_error() {
        let s = store();
        let other = TypeHierarchy::builder("type")
            .root("Vehicle")
            .subtype("Car", "Vehicle")
            .build()
            .unwrap();
        let foreign = other.resolve("Car").unwrap();
        assert!(matches!(
            compile(&s, actions::READ, foreign),
            Err(AbilityError::UnknownType { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn logs_skipped_rules() {
        let mut s = store();
        s.grant(actions::READ, "SubClassB", Conditions::new()).unwrap();

        let scope = s.accessible_scope(actions::READ, "SubClassA").unwrap();
        assert!(scope.is_deny_all());
        assert!(logs_contain("rule targets an unrelated branch"));
        assert!(logs_contain("access scope compiled"));
    }

    #[test]
    #[traced_test]
    fn logs_admitted_types() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA", Conditions::new()).unwrap();

        s.accessible_scope(actions::READ, "BaseClass").unwrap();
        assert!(logs_contain(r#"types=[Str("SubClassA"), Str("SubClassA1")]"#));
    }
}
