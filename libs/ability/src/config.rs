//! Configuration for the ability engine.
//!
//! The discriminator property and the set of valid types are supplied once at
//! process start and never renegotiated per call.

use std::collections::BTreeMap;

use ability_security::properties;
use serde::Deserialize;

use crate::error::{AbilityError, Result};

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbilityConfig {
    /// Name of the discriminator property (the STI column).
    pub discriminator: String,

    /// Types stored in the table, in declaration order.
    pub types: Vec<TypeConfig>,

    /// Extra action aliases, added on top of the built-in ones.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            discriminator: properties::DISCRIMINATOR.to_owned(),
            types: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }
}

impl AbilityConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityError::Config`] if the document is malformed or has
    /// unknown fields.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| AbilityError::Config(e.to_string()))
    }
}

/// A single type entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeConfig {
    /// Type name.
    pub name: String,

    /// Supertype name; absent for a root type.
    #[serde(default)]
    pub parent: Option<String>,

    /// Value stored in the discriminator column (defaults to `name`).
    #[serde(default)]
    pub discriminator_value: Option<String>,
}
