use ability_security::{FilterOp, ScopeConstraint, ScopeValue};
use sea_orm::{ColumnTrait, Condition, EntityTrait, Value, sea_query::Expr};

use crate::secure::{AccessScope, ScopableEntity};

/// Build a deny-all condition (`WHERE false`).
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Builds a `SeaORM` `Condition` from an `AccessScope` using property resolution.
///
/// # OR/AND Semantics
///
/// - Multiple constraints are OR-ed (alternative access paths)
/// - Filters within a constraint are AND-ed (all must match)
/// - Unknown properties fail that constraint (fail-closed)
/// - If all constraints fail resolution, deny-all
///
/// # Policy Rules
///
/// | Scope | Behavior |
/// |-------|----------|
/// | deny-all (default) | `WHERE false` |
/// | unconstrained (allow-all) | No filtering (`WHERE true`) |
/// | single constraint | AND of resolved filters |
/// | multiple constraints | OR of ANDed filter groups |
pub fn build_scope_condition<E>(scope: &AccessScope) -> Condition
where
    E: ScopableEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    if scope.is_unconstrained() {
        return Condition::all();
    }
    if scope.is_deny_all() {
        return deny_all();
    }

    let compiled: Vec<Condition> = scope
        .constraints()
        .iter()
        .filter_map(build_constraint_condition::<E>)
        .collect();

    match compiled.len() {
        0 => deny_all(),
        1 => compiled.into_iter().next().unwrap_or_else(deny_all),
        _ => compiled
            .into_iter()
            .fold(Condition::any(), |or_cond, c| or_cond.add(c)),
    }
}

/// Build SQL for a single constraint (AND of filters).
///
/// Returns `None` if any filter references an unknown property (fail-closed).
fn build_constraint_condition<E>(constraint: &ScopeConstraint) -> Option<Condition>
where
    E: ScopableEntity + EntityTrait,
    E::Column: ColumnTrait + Copy,
{
    if constraint.is_empty() {
        return Some(Condition::all());
    }
    let mut and_cond = Condition::all();
    for filter in constraint.filters() {
        let Some(col) = E::resolve_property(filter.property()) else {
            tracing::debug!(
                property = filter.property(),
                "scope property has no column; constraint dropped"
            );
            return None;
        };
        match filter.op() {
            FilterOp::In => {
                let values: Vec<Value> = filter.values().iter().map(to_value).collect();
                and_cond = and_cond.add(Expr::col(col).is_in(values));
            }
        }
    }
    Some(and_cond)
}

fn to_value(value: &ScopeValue) -> Value {
    match value {
        ScopeValue::Bool(b) => Value::from(*b),
        ScopeValue::Int(i) => Value::from(*i),
        ScopeValue::Uuid(u) => Value::from(*u),
        ScopeValue::Str(s) => Value::from(s.clone()),
    }
}
