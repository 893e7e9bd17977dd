//! Error types for the ability engine.
//!
//! Every variant is a configuration error: it is raised at the call that
//! introduced the bad reference and is never deferred to predicate execution.
//! An empty accessible set is not an error.

use thiserror::Error;

/// Ability engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbilityError {
    /// A grant, query or condition named a type the hierarchy does not know.
    #[error("unknown type: {name}")]
    UnknownType { name: String },

    /// The same type name was declared twice.
    #[error("type declared more than once: {name}")]
    DuplicateType { name: String },

    /// Two types share a discriminator value.
    #[error("discriminator value used by more than one type: {value}")]
    DuplicateDiscriminatorValue { value: String },

    /// A discriminator value equals the name of a different type.
    #[error("discriminator value {value} is also the name of another type")]
    AmbiguousDiscriminatorValue { value: String },

    /// A type names a parent that was never declared.
    #[error("type {name} has unknown parent {parent}")]
    UnknownParent { name: String, parent: String },

    /// Following parent links from this type leads back to it.
    #[error("type hierarchy contains a cycle through {name}")]
    CyclicHierarchy { name: String },

    /// The discriminator property name is empty.
    #[error("discriminator property name must not be empty")]
    EmptyDiscriminator,

    /// A discriminator condition value is neither a known literal nor a type.
    #[error("invalid condition on discriminator field {field}: {reason}")]
    InvalidDiscriminatorCondition { field: String, reason: String },

    /// An action alias would shadow or loop onto a reserved action.
    #[error("invalid alias for action {action}: {reason}")]
    InvalidAlias { action: String, reason: String },

    /// A record carries no usable discriminator value.
    #[error("record has no string value for discriminator property {property}")]
    MissingDiscriminator { property: String },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AbilityError {
    /// Create an unknown-type error.
    #[must_use]
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Create an invalid discriminator condition error.
    #[must_use]
    pub fn invalid_discriminator(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDiscriminatorCondition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid alias error.
    #[must_use]
    pub fn invalid_alias(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAlias {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for ability operations.
pub type Result<T> = std::result::Result<T, AbilityError>;
