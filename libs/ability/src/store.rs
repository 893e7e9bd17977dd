//! Per-principal rule store.

use std::sync::Arc;

use ability_security::{AccessScope, ScopedRecord};
use tracing::instrument;
use uuid::Uuid;

use crate::actions::ActionAliases;
use crate::compiler;
use crate::error::{AbilityError, Result};
use crate::hierarchy::{TypeHierarchy, TypeRef};
use crate::rule::{Conditions, Rule, RuleSubject};

/// Append-only collection of grants for one principal.
///
/// Populate with `grant*` calls, then query. Registration order is kept for
/// deterministic iteration but never changes what a query selects.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ability::{Conditions, RuleStore, TypeHierarchy, actions};
/// use uuid::Uuid;
///
/// let hierarchy = Arc::new(
///     TypeHierarchy::builder("type")
///         .root("BaseClass")
///         .subtype("SubClassA", "BaseClass")
///         .subtype("SubClassB", "BaseClass")
///         .build()?,
/// );
///
/// let mut store = RuleStore::new(Uuid::nil(), hierarchy);
/// store.grant(actions::READ, "SubClassA", Conditions::new())?;
///
/// let scope = store.accessible_scope(actions::READ, "BaseClass")?;
/// assert_eq!(scope.constraints().len(), 1);
/// # Ok::<(), ability::AbilityError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RuleStore {
    subject: Uuid,
    hierarchy: Arc<TypeHierarchy>,
    aliases: ActionAliases,
    rules: Vec<Rule>,
}

impl RuleStore {
    /// Empty store for `subject`, with the default action aliases.
    #[must_use]
    pub fn new(subject: Uuid, hierarchy: Arc<TypeHierarchy>) -> Self {
        Self {
            subject,
            hierarchy,
            aliases: ActionAliases::default(),
            rules: Vec::new(),
        }
    }

    /// Replace the action alias table.
    #[must_use]
    pub fn with_aliases(mut self, aliases: ActionAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// The principal these rules belong to.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }

    #[must_use]
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    #[must_use]
    pub fn aliases(&self) -> &ActionAliases {
        &self.aliases
    }

    /// Grant `action` on the type named `subject_type`.
    ///
    /// # Errors
    ///
    /// [`AbilityError::UnknownType`] for an unknown type name, or any error
    /// raised while normalizing the discriminator condition.
    #[instrument(level = "debug", skip(self, conditions), fields(subject = %self.subject))]
    pub fn grant(
        &mut self,
        action: &str,
        subject_type: &str,
        conditions: Conditions,
    ) -> Result<&mut Self> {
        let ty = self.hierarchy.resolve(subject_type)?;
        self.push(action, RuleSubject::Type(ty), conditions)
    }

    /// Grant `action` on a type handle.
    ///
    /// # Errors
    ///
    /// Same as [`grant`](Self::grant); a handle from another hierarchy is an
    /// unknown type.
    pub fn grant_type(
        &mut self,
        action: &str,
        subject_type: TypeRef,
        conditions: Conditions,
    ) -> Result<&mut Self> {
        self.push(action, RuleSubject::Type(subject_type), conditions)
    }

    /// Grant `action` on every type.
    ///
    /// # Errors
    ///
    /// Errors raised while normalizing the discriminator condition.
    pub fn grant_all(&mut self, action: &str, conditions: Conditions) -> Result<&mut Self> {
        self.push(action, RuleSubject::All, conditions)
    }

    fn push(
        &mut self,
        action: &str,
        subject: RuleSubject,
        conditions: Conditions,
    ) -> Result<&mut Self> {
        let rule = Rule::new(&self.hierarchy, action, subject, conditions)?;
        tracing::debug!(
            action,
            granted_types = rule.granted_types().len(),
            "grant registered"
        );
        self.rules.push(rule);
        Ok(self)
    }

    /// Every rule, in registration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules that apply to `action`, directly, through an alias or via `manage`.
    pub fn rules_for<'a>(&'a self, action: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules
            .iter()
            .filter(move |r| self.aliases.covers(r.action(), action))
    }

    /// Predicate selecting the rows of `target` (and its subtypes) the
    /// principal may `action`.
    ///
    /// # Errors
    ///
    /// [`AbilityError::UnknownType`] if `target` is not a known type.
    pub fn accessible_scope(&self, action: &str, target: &str) -> Result<AccessScope> {
        let target = self.hierarchy.resolve(target)?;
        compiler::compile(self, action, target)
    }

    /// Whether the principal may `action` this particular record.
    ///
    /// The record's declared type is read from its discriminator property.
    ///
    /// # Errors
    ///
    /// - [`AbilityError::MissingDiscriminator`] if the record has no string discriminator
    /// - [`AbilityError::UnknownType`] if the discriminator names no known type
    pub fn can<R: ScopedRecord + ?Sized>(&self, action: &str, record: &R) -> Result<bool> {
        let property = self.hierarchy.discriminator();
        let value = record
            .property(property)
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| AbilityError::MissingDiscriminator {
                property: property.to_owned(),
            })?;
        let declared = self
            .hierarchy
            .resolve_discriminator_value(&value)
            .ok_or_else(|| AbilityError::unknown_type(&value))?;

        Ok(compiler::compile(self, action, declared)?.matches(record))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::BTreeMap;

    use ability_security::ScopeValue;

    use super::*;
    use crate::actions;

    fn store() -> RuleStore {
        let hierarchy = TypeHierarchy::builder("type")
            .root("BaseClass")
            .subtype("SubClassA", "BaseClass")
            .subtype("SubClassB", "BaseClass")
            .build()
            .unwrap();
        RuleStore::new(Uuid::new_v4(), Arc::new(hierarchy))
    }

    fn record(kind: &str, owner: i64) -> BTreeMap<String, ScopeValue> {
        BTreeMap::from([
            ("type".to_owned(), ScopeValue::from(kind)),
            ("owner_id".to_owned(), ScopeValue::from(owner)),
        ])
    }

    #[test]
    fn grants_append_in_order_without_dedup() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA", Conditions::new())
            .unwrap()
            .grant(actions::READ, "SubClassA", Conditions::new())
            .unwrap()
            .grant(actions::UPDATE, "SubClassB", Conditions::new())
            .unwrap();

        assert_eq!(s.rules().len(), 3);
        assert_eq!(s.rules()[2].action(), actions::UPDATE);
    }

    #[test]
    fn unknown_subject_type_fails_at_grant_time() {
        let mut s = store();
        let err = s
            .grant(actions::READ, "SubClassZ", Conditions::new())
            .unwrap_err();
        assert_eq!(err, AbilityError::unknown_type("SubClassZ"));
        assert!(s.rules().is_empty());
    }

    #[test]
    fn unknown_query_type_fails_at_call_time() {
        let s = store();
        assert!(matches!(
            s.accessible_scope(actions::READ, "Nope"),
            Err(AbilityError::UnknownType { .. })
        ));
    }

    #[test]
    fn rules_for_filters_by_action_with_aliases() {
        let mut s = store();
        s.grant(actions::READ, "SubClassA", Conditions::new()).unwrap();
        s.grant(actions::UPDATE, "SubClassA", Conditions::new()).unwrap();
        s.grant_all(actions::MANAGE, Conditions::new()).unwrap();

        let for_show: Vec<_> = s.rules_for(actions::SHOW).map(Rule::action).collect();
        assert_eq!(for_show, vec![actions::READ, actions::MANAGE]);

        let for_edit: Vec<_> = s.rules_for(actions::EDIT).map(Rule::action).collect();
        assert_eq!(for_edit, vec![actions::UPDATE, actions::MANAGE]);
    }

    #[test]
    fn custom_aliases_replace_defaults() {
        let mut s = store().with_aliases(ActionAliases::empty());
        s.grant(actions::READ, "BaseClass", Conditions::new()).unwrap();
        assert_eq!(s.rules_for(actions::INDEX).count(), 0);
        assert_eq!(s.rules_for(actions::READ).count(), 1);
    }

    #[test]
    fn can_checks_single_records() {
        let mut s = store();
        s.grant(
            actions::READ,
            "SubClassA",
            Conditions::new().with("owner_id", 1),
        )
        .unwrap();

        assert!(s.can(actions::SHOW, &record("SubClassA", 1)).unwrap());
        assert!(!s.can(actions::SHOW, &record("SubClassA", 2)).unwrap());
        assert!(!s.can(actions::SHOW, &record("SubClassB", 1)).unwrap());
        assert!(!s.can(actions::UPDATE, &record("SubClassA", 1)).unwrap());
    }

    #[test]
    fn can_requires_a_known_discriminator() {
        let s = store();
        let no_type: BTreeMap<String, ScopeValue> = BTreeMap::new();
        assert!(matches!(
            s.can(actions::READ, &no_type),
            Err(AbilityError::MissingDiscriminator { .. })
        ));
        assert!(matches!(
            s.can(actions::READ, &record("Ghost", 1)),
            Err(AbilityError::UnknownType { .. })
        ));
    }

    #[test]
    fn handles_from_another_hierarchy_are_rejected() {
        let vehicles = TypeHierarchy::builder("type")
            .root("Vehicle")
            .subtype("Car", "Vehicle")
            .build()
            .unwrap();
        let car = vehicles.resolve("Car").unwrap();
        let mut s = store();

        assert!(matches!(
            s.grant_type(actions::READ, car, Conditions::new()),
            Err(AbilityError::UnknownType { .. })
        ));
        assert!(matches!(
            s.grant(actions::READ, "BaseClass", Conditions::new().with("type", car)),
            Err(AbilityError::InvalidDiscriminatorCondition { .. })
        ));
        assert!(matches!(
            s.grant(actions::READ, "BaseClass", Conditions::new().with("owner_type", car)),
            Err(AbilityError::UnknownType { .. })
        ));
        assert!(s.rules().is_empty());
        assert!(!s.can(actions::READ, &record("SubClassA", 1)).unwrap());
    }
}
