//! Scope-to-condition translation.

mod cond;

pub use ability_security::AccessScope;
pub use cond::build_scope_condition;

use sea_orm::EntityTrait;

/// An entity whose rows can be filtered by an [`AccessScope`].
///
/// Maps authorization property names (the discriminator, condition fields)
/// to columns. Unmapped properties make the constraint that uses them fail
/// closed.
///
/// ```ignore
/// impl ScopableEntity for base_class::Entity {
///     fn resolve_property(property: &str) -> Option<base_class::Column> {
///         match property {
///             "type" => Some(base_class::Column::Kind),
///             "owner_id" => Some(base_class::Column::OwnerId),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait ScopableEntity: EntityTrait {
    /// Column backing an authorization property.
    fn resolve_property(property: &str) -> Option<Self::Column>;
}
