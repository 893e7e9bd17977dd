//! Grant records.
//!
//! Conditions are normalized when the rule is built: a discriminator
//! condition is resolved to type handles right away, whether it was written
//! as a stored value (`"SubClassA"`) or as a type reference, so both spellings
//! produce identical rules.

use std::collections::{BTreeMap, BTreeSet};

use ability_security::ScopeValue;
use uuid::Uuid;

use crate::error::{AbilityError, Result};
use crate::hierarchy::{TypeHierarchy, TypeRef};

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    /// Equality with a literal.
    Value(ScopeValue),
    /// Membership in a set of literals.
    Values(Vec<ScopeValue>),
    /// A type reference (compared by discriminator value).
    Type(TypeRef),
    /// Any of several type references.
    Types(Vec<TypeRef>),
}

impl From<ScopeValue> for ConditionValue {
    fn from(value: ScopeValue) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::Value(value.into())
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        Self::Value(value.into())
    }
}

impl From<i32> for ConditionValue {
    fn from(value: i32) -> Self {
        Self::Value(value.into())
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Value(value.into())
    }
}

impl From<Uuid> for ConditionValue {
    fn from(value: Uuid) -> Self {
        Self::Value(value.into())
    }
}

impl From<TypeRef> for ConditionValue {
    fn from(value: TypeRef) -> Self {
        Self::Type(value)
    }
}

impl From<Vec<ScopeValue>> for ConditionValue {
    fn from(values: Vec<ScopeValue>) -> Self {
        Self::Values(values)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Values(values.into_iter().map(ScopeValue::from).collect())
    }
}

impl From<Vec<TypeRef>> for ConditionValue {
    fn from(values: Vec<TypeRef>) -> Self {
        Self::Types(values)
    }
}

/// Field conditions attached to a grant. Empty means unconditional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    entries: BTreeMap<String, ConditionValue>,
}

impl Conditions {
    /// No conditions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the condition on `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<ConditionValue>) -> Self {
        self.entries.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What a rule was granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSubject {
    /// Every type in the hierarchy.
    All,
    /// One type and, implicitly, its subtypes.
    Type(TypeRef),
}

/// A non-discriminator condition: `field IN values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCondition {
    field: String,
    values: Vec<ScopeValue>,
}

impl FieldCondition {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn values(&self) -> &[ScopeValue] {
        &self.values
    }
}

/// An immutable, normalized grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    action: String,
    subject: RuleSubject,
    discriminator_types: Option<BTreeSet<TypeRef>>,
    fields: Vec<FieldCondition>,
    granted_types: BTreeSet<TypeRef>,
}

impl Rule {
    pub(crate) fn new(
        hierarchy: &TypeHierarchy,
        action: impl Into<String>,
        subject: RuleSubject,
        conditions: Conditions,
    ) -> Result<Self> {
        let mut granted_types: BTreeSet<TypeRef> = match subject {
            RuleSubject::All => hierarchy.all_types().collect(),
            RuleSubject::Type(ty) => {
                ensure_known(hierarchy, ty)?;
                hierarchy.descendants_inclusive(ty)
            }
        };

        let mut discriminator_types = None;
        let mut fields = Vec::new();
        for (field, value) in conditions.entries {
            if field == hierarchy.discriminator() {
                let types = resolve_discriminator(hierarchy, &field, value)?;
                let covered: BTreeSet<TypeRef> = types
                    .iter()
                    .flat_map(|ty| hierarchy.descendants_inclusive(*ty))
                    .collect();
                granted_types.retain(|ty| covered.contains(ty));
                discriminator_types = Some(types);
            } else {
                let values = literal_values(hierarchy, value)?;
                fields.push(FieldCondition { field, values });
            }
        }

        Ok(Self {
            action: action.into(),
            subject,
            discriminator_types,
            fields,
            granted_types,
        })
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn subject(&self) -> RuleSubject {
        self.subject
    }

    /// Types named by the discriminator condition, if the rule had one.
    #[must_use]
    pub fn discriminator_types(&self) -> Option<&BTreeSet<TypeRef>> {
        self.discriminator_types.as_ref()
    }

    /// Non-discriminator conditions, ordered by field name.
    #[must_use]
    pub fn field_conditions(&self) -> &[FieldCondition] {
        &self.fields
    }

    /// Every declared type whose rows this rule can admit.
    #[must_use]
    pub fn granted_types(&self) -> &BTreeSet<TypeRef> {
        &self.granted_types
    }

    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.discriminator_types.is_none() && self.fields.is_empty()
    }
}

fn ensure_known(hierarchy: &TypeHierarchy, ty: TypeRef) -> Result<()> {
    if hierarchy.contains(ty) {
        Ok(())
    } else {
        Err(AbilityError::unknown_type(format!("{ty:?}")))
    }
}

fn resolve_discriminator(
    hierarchy: &TypeHierarchy,
    field: &str,
    value: ConditionValue,
) -> Result<BTreeSet<TypeRef>> {
    let resolve_literal = |literal: &ScopeValue| match literal.as_str() {
        Some(s) => hierarchy.resolve_discriminator_value(s).ok_or_else(|| {
            AbilityError::invalid_discriminator(field, format!("{s:?} names no known type"))
        }),
        None => Err(AbilityError::invalid_discriminator(
            field,
            format!("expected a type name or type reference, got {literal}"),
        )),
    };
    let check = |ty: TypeRef| {
        if hierarchy.contains(ty) {
            Ok(ty)
        } else {
            Err(AbilityError::invalid_discriminator(
                field,
                format!("{ty:?} does not belong to this hierarchy"),
            ))
        }
    };

    match value {
        ConditionValue::Value(literal) => resolve_literal(&literal).map(|ty| BTreeSet::from([ty])),
        ConditionValue::Values(literals) => literals.iter().map(resolve_literal).collect(),
        ConditionValue::Type(ty) => check(ty).map(|ty| BTreeSet::from([ty])),
        ConditionValue::Types(types) => types.into_iter().map(check).collect(),
    }
}

fn literal_values(hierarchy: &TypeHierarchy, value: ConditionValue) -> Result<Vec<ScopeValue>> {
    let type_value = |ty: TypeRef| {
        hierarchy
            .discriminator_value(ty)
            .map(ScopeValue::from)
            .ok_or_else(|| AbilityError::unknown_type(format!("{ty:?}")))
    };
    match value {
        ConditionValue::Value(v) => Ok(vec![v]),
        ConditionValue::Values(vs) => Ok(vs),
        ConditionValue::Type(ty) => type_value(ty).map(|v| vec![v]),
        ConditionValue::Types(types) => types.into_iter().map(type_value).collect(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sti() -> TypeHierarchy {
        TypeHierarchy::builder("type")
            .root("BaseClass")
            .subtype("SubClassA", "BaseClass")
            .subtype("SubClassB", "BaseClass")
            .build()
            .unwrap()
    }

    #[test]
    fn string_and_type_discriminators_normalize_identically() {
        let h = sti();
        let base = h.resolve("BaseClass").unwrap();
        let a = h.resolve("SubClassA").unwrap();

        let by_string = Rule::new(
            &h,
            "read",
            RuleSubject::Type(base),
            Conditions::new().with("type", "SubClassA"),
        )
        .unwrap();
        let by_type = Rule::new(
            &h,
            "read",
            RuleSubject::Type(base),
            Conditions::new().with("type", a),
        )
        .unwrap();
        let direct = Rule::new(&h, "read", RuleSubject::Type(a), Conditions::new()).unwrap();

        assert_eq!(by_string, by_type);
        assert_eq!(by_string.granted_types(), direct.granted_types());
        assert_eq!(by_string.granted_types(), &BTreeSet::from([a]));
    }

    #[test]
    fn discriminator_list_is_a_union() {
        let h = sti();
        let base = h.resolve("BaseClass").unwrap();
        let a = h.resolve("SubClassA").unwrap();
        let b = h.resolve("SubClassB").unwrap();

        let rule = Rule::new(
            &h,
            "read",
            RuleSubject::Type(base),
            Conditions::new().with("type", vec!["SubClassA", "SubClassB"]),
        )
        .unwrap();
        assert_eq!(rule.granted_types(), &BTreeSet::from([a, b]));
        assert_eq!(rule.discriminator_types(), Some(&BTreeSet::from([a, b])));
    }

    #[test]
    fn discriminator_outside_subject_grants_nothing() {
        let h = sti();
        let a = h.resolve("SubClassA").unwrap();

        let rule = Rule::new(
            &h,
            "read",
            RuleSubject::Type(a),
            Conditions::new().with("type", "SubClassB"),
        )
        .unwrap();
        assert!(rule.granted_types().is_empty());
    }

    #[test]
    fn unknown_or_non_string_discriminator_is_rejected() {
        let h = sti();
        let base = h.resolve("BaseClass").unwrap();

        let err = Rule::new(
            &h,
            "read",
            RuleSubject::Type(base),
            Conditions::new().with("type", "SubClassZ"),
        )
        .unwrap_err();
        assert!(matches!(err, AbilityError::InvalidDiscriminatorCondition { .. }));

        let err = Rule::new(
            &h,
            "read",
            RuleSubject::Type(base),
            Conditions::new().with("type", 3),
        )
        .unwrap_err();
        assert!(matches!(err, AbilityError::InvalidDiscriminatorCondition { .. }));
    }

    #[test]
    fn field_conditions_keep_literals_and_stringify_types() {
        let h = sti();
        let a = h.resolve("SubClassA").unwrap();

        let rule = Rule::new(
            &h,
            "read",
            RuleSubject::All,
            Conditions::new()
                .with("owner_id", 7)
                .with("commentable_type", a),
        )
        .unwrap();

        assert_eq!(rule.granted_types().len(), 3);
        assert!(rule.discriminator_types().is_none());
        let fields: Vec<_> = rule
            .field_conditions()
            .iter()
            .map(|f| (f.field(), f.values().to_vec()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("commentable_type", vec![ScopeValue::from("SubClassA")]),
                ("owner_id", vec![ScopeValue::from(7)]),
            ]
        );
        assert!(!rule.is_unconditional());
    }
}
