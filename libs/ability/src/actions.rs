//! Action vocabulary and alias expansion.
//!
//! A rule granted on an alias covers every action the alias expands to:
//! `read` answers queries for `index` and `show`. A rule on [`MANAGE`]
//! covers every action.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::AbilityConfig;
use crate::error::{AbilityError, Result};

pub const MANAGE: &str = "manage";
pub const READ: &str = "read";
pub const INDEX: &str = "index";
pub const SHOW: &str = "show";
pub const CREATE: &str = "create";
pub const NEW: &str = "new";
pub const UPDATE: &str = "update";
pub const EDIT: &str = "edit";
pub const DESTROY: &str = "destroy";

/// Alias table: alias name → actions it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAliases {
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl Default for ActionAliases {
    /// `read → index, show`, `create → new`, `update → edit`.
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            READ.to_owned(),
            BTreeSet::from([INDEX.to_owned(), SHOW.to_owned()]),
        );
        aliases.insert(CREATE.to_owned(), BTreeSet::from([NEW.to_owned()]));
        aliases.insert(UPDATE.to_owned(), BTreeSet::from([EDIT.to_owned()]));
        Self { aliases }
    }
}

impl ActionAliases {
    /// An alias table with no entries, not even the defaults.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// The defaults plus the aliases declared in configuration.
    ///
    /// # Errors
    ///
    /// Same as [`alias`](Self::alias).
    pub fn from_config(config: &AbilityConfig) -> Result<Self> {
        config
            .aliases
            .iter()
            .try_fold(Self::default(), |acc, (alias, targets)| {
                acc.alias(alias, targets.iter().map(String::as_str))
            })
    }

    /// Make `alias` stand for `targets` (in addition to anything it already covers).
    ///
    /// # Errors
    ///
    /// Returns [`AbilityError::InvalidAlias`] if `alias` is `manage`, or a target
    /// is `manage` or the alias itself.
    pub fn alias<'a>(
        mut self,
        alias: &str,
        targets: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        if alias == MANAGE {
            return Err(AbilityError::invalid_alias(alias, "manage cannot be aliased"));
        }
        let entry = self.aliases.entry(alias.to_owned()).or_default();
        for target in targets {
            if target == MANAGE {
                return Err(AbilityError::invalid_alias(
                    alias,
                    "cannot alias onto manage",
                ));
            }
            if target == alias {
                return Err(AbilityError::invalid_alias(alias, "cannot alias onto itself"));
            }
            entry.insert(target.to_owned());
        }
        Ok(self)
    }

    /// The action and everything it transitively stands for.
    #[must_use]
    pub fn expand(&self, action: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack = vec![action.to_owned()];
        while let Some(next) = stack.pop() {
            if let Some(targets) = self.aliases.get(&next) {
                stack.extend(targets.iter().filter(|t| !out.contains(*t)).cloned());
            }
            out.insert(next);
        }
        out
    }

    /// Whether a rule granted on `granted` applies to a query for `requested`.
    #[must_use]
    pub fn covers(&self, granted: &str, requested: &str) -> bool {
        granted == MANAGE || granted == requested || self.expand(granted).contains(requested)
    }
}
