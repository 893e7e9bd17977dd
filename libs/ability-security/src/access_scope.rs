use crate::value::ScopeValue;

/// Well-known authorization property names.
///
/// The discriminator property name is configurable per type hierarchy; this
/// is the name used when none is configured.
pub mod properties {
    /// Single-table-inheritance discriminator. Typically maps to a `type` column.
    pub const DISCRIMINATOR: &str = "type";
}

/// Predicate operation type for scope filters.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FilterOp {
    /// `property IN (values)` — flat set membership. An empty set matches nothing.
    In,
}

/// A single scope filter — a condition on a named row property.
///
/// The property name (e.g. `"type"`, `"owner_id"`) is an authorization
/// concept. Mapping to DB columns is done by the storage adapter.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScopeFilter {
    property: String,
    op: FilterOp,
    values: Vec<ScopeValue>,
}

impl ScopeFilter {
    /// Create a new scope filter.
    #[must_use]
    pub fn new(property: impl Into<String>, op: FilterOp, values: Vec<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            op,
            values,
        }
    }

    /// Create an `IN` filter.
    #[must_use]
    pub fn is_in(property: impl Into<String>, values: Vec<ScopeValue>) -> Self {
        Self::new(property, FilterOp::In, values)
    }

    /// The authorization property name.
    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// The filter operation.
    #[inline]
    #[must_use]
    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    /// The filter values.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[ScopeValue] {
        &self.values
    }

    /// Evaluate this filter against a record. A missing property never matches.
    #[must_use]
    pub fn matches<R: ScopedRecord + ?Sized>(&self, record: &R) -> bool {
        let Some(actual) = record.property(&self.property) else {
            return false;
        };
        match self.op {
            FilterOp::In => self.values.contains(&actual),
        }
    }
}

/// A conjunction (AND) of scope filters — one access path.
///
/// All filters within a constraint must match simultaneously for a row
/// to be accessible via this path.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScopeConstraint {
    filters: Vec<ScopeFilter>,
}

impl ScopeConstraint {
    /// Create a new scope constraint from a list of filters.
    #[must_use]
    pub fn new(filters: Vec<ScopeFilter>) -> Self {
        Self { filters }
    }

    /// The filters in this constraint (AND-ed together).
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }

    /// Returns `true` if this constraint has no filters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns `true` if every filter matches the record.
    #[must_use]
    pub fn matches<R: ScopedRecord + ?Sized>(&self, record: &R) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}

/// A row the scope can be evaluated against in memory.
pub trait ScopedRecord {
    /// The value of a named property, or `None` when the row has no such property.
    fn property(&self, name: &str) -> Option<ScopeValue>;
}

impl ScopedRecord for std::collections::BTreeMap<String, ScopeValue> {
    fn property(&self, name: &str) -> Option<ScopeValue> {
        self.get(name).cloned()
    }
}

/// A disjunction (OR) of scope constraints defining what data is accessible.
///
/// Each constraint is an independent access path (OR-ed). Filters within a
/// constraint are AND-ed. An unconstrained scope bypasses row-level filtering.
///
/// # Examples
///
/// ```
/// use ability_security::{AccessScope, ScopeConstraint, ScopeFilter, ScopeValue, properties};
///
/// // deny-all (default)
/// let scope = AccessScope::deny_all();
/// assert!(scope.is_deny_all());
///
/// // single subtype
/// let scope = AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::is_in(
///     properties::DISCRIMINATOR,
///     vec![ScopeValue::from("SubClassA")],
/// )]));
/// assert!(!scope.is_deny_all());
/// assert_eq!(
///     scope.all_values_for(properties::DISCRIMINATOR),
///     vec![ScopeValue::from("SubClassA")]
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccessScope {
    constraints: Vec<ScopeConstraint>,
    unconstrained: bool,
}

impl Default for AccessScope {
    /// Default is deny-all: no constraints and not unconstrained.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    // ── Constructors ────────────────────────────────────────────────

    /// Create an access scope from a list of constraints (OR-ed).
    #[must_use]
    pub fn from_constraints(constraints: Vec<ScopeConstraint>) -> Self {
        Self {
            constraints,
            unconstrained: false,
        }
    }

    /// Create an access scope with a single constraint.
    #[must_use]
    pub fn single(constraint: ScopeConstraint) -> Self {
        Self::from_constraints(vec![constraint])
    }

    /// Create an "allow all" (unconstrained) scope.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: true,
        }
    }

    /// Create a "deny all" scope (no access).
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The constraints in this scope (OR-ed).
    #[inline]
    #[must_use]
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    /// Returns `true` if this scope is unconstrained (allow-all).
    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    /// Returns `true` if this scope denies all access.
    ///
    /// A scope is deny-all when it is not unconstrained and has no constraints.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.constraints.is_empty()
    }

    /// Collect all values for a given property across all constraints.
    ///
    /// Duplicates are kept; the order follows constraint order.
    #[must_use]
    pub fn all_values_for(&self, property: &str) -> Vec<ScopeValue> {
        let mut result = Vec::new();
        for constraint in &self.constraints {
            for filter in constraint.filters() {
                if filter.property() == property && *filter.op() == FilterOp::In {
                    result.extend_from_slice(filter.values());
                }
            }
        }
        result
    }

    // ── Evaluation ──────────────────────────────────────────────────

    /// Returns `true` if the record is selected by this scope.
    #[must_use]
    pub fn matches<R: ScopedRecord + ?Sized>(&self, record: &R) -> bool {
        self.unconstrained || self.constraints.iter().any(|c| c.matches(record))
    }

    /// Filter a slice of records down to the ones this scope selects.
    #[must_use]
    pub fn select<'a, R: ScopedRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }
}
