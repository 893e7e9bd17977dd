//! Single-table type hierarchy.
//!
//! One storage table holds rows of several logical types; the discriminator
//! property of each row names its declared type. A row is also an instance of
//! every ancestor of its declared type.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{AbilityConfig, TypeConfig};
use crate::error::{AbilityError, Result};

static NEXT_HIERARCHY_ID: AtomicU64 = AtomicU64::new(0);

/// Handle of a type inside the [`TypeHierarchy`] that produced it.
///
/// Handles order by declaration, so sets of them iterate deterministically.
/// A handle is only valid for the hierarchy that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    hierarchy: u64,
    index: usize,
}

#[derive(Debug, Clone)]
struct TypeNode {
    name: String,
    discriminator_value: String,
    parent: Option<TypeRef>,
    children: Vec<TypeRef>,
}

/// Immutable forest of types sharing one discriminator property.
///
/// Built once at configuration time and shared (usually behind an `Arc`)
/// by every rule store and compiler invocation.
#[derive(Debug, Clone)]
pub struct TypeHierarchy {
    id: u64,
    discriminator: String,
    nodes: Vec<TypeNode>,
    by_name: HashMap<String, TypeRef>,
    by_value: HashMap<String, TypeRef>,
}

impl TypeHierarchy {
    /// Start building a hierarchy whose rows carry `discriminator`.
    #[must_use]
    pub fn builder(discriminator: impl Into<String>) -> TypeHierarchyBuilder {
        TypeHierarchyBuilder {
            discriminator: discriminator.into(),
            entries: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build the hierarchy described by a configuration.
    ///
    /// # Errors
    ///
    /// Same as [`TypeHierarchyBuilder::build`].
    pub fn from_config(config: &AbilityConfig) -> Result<Self> {
        TypeHierarchyBuilder {
            discriminator: config.discriminator.clone(),
            entries: config.types.clone(),
            values: Vec::new(),
        }
        .build()
    }

    /// The discriminator property name.
    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Look up a type by name.
    ///
    /// # Errors
    ///
    /// Returns [`AbilityError::UnknownType`] if no type has this name.
    pub fn resolve(&self, name: &str) -> Result<TypeRef> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| AbilityError::unknown_type(name))
    }

    /// Look up the type a stored discriminator value, or a type name, denotes.
    ///
    /// [`TypeHierarchyBuilder::build`] rejects values that collide with
    /// another type's name, so at most one type can match.
    #[must_use]
    pub fn resolve_discriminator_value(&self, value: &str) -> Option<TypeRef> {
        self.by_value
            .get(value)
            .or_else(|| self.by_name.get(value))
            .copied()
    }

    /// Returns `true` if the handle was issued by this hierarchy.
    #[must_use]
    pub fn contains(&self, ty: TypeRef) -> bool {
        ty.hierarchy == self.id && ty.index < self.nodes.len()
    }

    fn node(&self, ty: TypeRef) -> Option<&TypeNode> {
        if self.contains(ty) {
            self.nodes.get(ty.index)
        } else {
            None
        }
    }

    /// Type name.
    #[must_use]
    pub fn name(&self, ty: TypeRef) -> Option<&str> {
        self.node(ty).map(|n| n.name.as_str())
    }

    /// Value stored in the discriminator column for rows of this type.
    #[must_use]
    pub fn discriminator_value(&self, ty: TypeRef) -> Option<&str> {
        self.node(ty).map(|n| n.discriminator_value.as_str())
    }

    /// Direct supertype.
    #[must_use]
    pub fn parent(&self, ty: TypeRef) -> Option<TypeRef> {
        self.node(ty).and_then(|n| n.parent)
    }

    /// Every type, in declaration order.
    pub fn all_types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        let hierarchy = self.id;
        (0..self.nodes.len()).map(move |index| TypeRef { hierarchy, index })
    }

    /// `true` iff `candidate == ancestor` or `candidate` descends from `ancestor`.
    ///
    /// Always `false` for handles issued by another hierarchy.
    #[must_use]
    pub fn is_subtype_or_self(&self, candidate: TypeRef, ancestor: TypeRef) -> bool {
        if !self.contains(candidate) || !self.contains(ancestor) {
            return false;
        }
        let mut current = Some(candidate);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = self.parent(ty);
        }
        false
    }

    /// `ty` followed by its supertypes up to the root.
    #[must_use]
    pub fn ancestors_inclusive(&self, ty: TypeRef) -> Vec<TypeRef> {
        let mut out = Vec::new();
        let mut current = self.contains(ty).then_some(ty);
        while let Some(t) = current {
            out.push(t);
            current = self.parent(t);
        }
        out
    }

    /// `ty` plus every transitive subtype.
    #[must_use]
    pub fn descendants_inclusive(&self, ty: TypeRef) -> BTreeSet<TypeRef> {
        let mut out = BTreeSet::new();
        if !self.contains(ty) {
            return out;
        }
        let mut stack = vec![ty];
        while let Some(t) = stack.pop() {
            if !out.insert(t) {
                continue;
            }
            if let Some(node) = self.node(t) {
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }
}

/// Builder for [`TypeHierarchy`].
///
/// Types may be declared in any order; parents are resolved in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TypeHierarchyBuilder {
    discriminator: String,
    entries: Vec<TypeConfig>,
    values: Vec<(String, String)>,
}

impl TypeHierarchyBuilder {
    /// Declare a root type.
    #[must_use]
    pub fn root(mut self, name: impl Into<String>) -> Self {
        self.entries.push(TypeConfig {
            name: name.into(),
            parent: None,
            discriminator_value: None,
        });
        self
    }

    /// Declare a subtype of `parent`.
    #[must_use]
    pub fn subtype(mut self, name: impl Into<String>, parent: impl Into<String>) -> Self {
        self.entries.push(TypeConfig {
            name: name.into(),
            parent: Some(parent.into()),
            discriminator_value: None,
        });
        self
    }

    /// Override the stored discriminator value of a declared type.
    #[must_use]
    pub fn discriminator_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Validate and freeze the hierarchy.
    ///
    /// # Errors
    ///
    /// - [`AbilityError::EmptyDiscriminator`] for a blank discriminator name
    /// - [`AbilityError::DuplicateType`] / [`AbilityError::DuplicateDiscriminatorValue`]
    /// - [`AbilityError::AmbiguousDiscriminatorValue`] if a value equals another type's name
    /// - [`AbilityError::UnknownType`] for a value override on an undeclared type
    /// - [`AbilityError::UnknownParent`] for a dangling parent reference
    /// - [`AbilityError::CyclicHierarchy`] if parent links loop
    pub fn build(self) -> Result<TypeHierarchy> {
        let Self {
            discriminator,
            mut entries,
            values,
        } = self;

        if discriminator.trim().is_empty() {
            return Err(AbilityError::EmptyDiscriminator);
        }

        let id = NEXT_HIERARCHY_ID.fetch_add(1, Ordering::Relaxed);
        let type_ref = |index| TypeRef {
            hierarchy: id,
            index,
        };

        let mut by_name = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), type_ref(idx)).is_some() {
                return Err(AbilityError::DuplicateType {
                    name: entry.name.clone(),
                });
            }
        }

        for (name, value) in values {
            let ty = by_name
                .get(&name)
                .copied()
                .ok_or_else(|| AbilityError::unknown_type(&name))?;
            if let Some(entry) = entries.get_mut(ty.index) {
                entry.discriminator_value = Some(value);
            }
        }

        let mut nodes = Vec::with_capacity(entries.len());
        let mut by_value = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            let parent = match &entry.parent {
                Some(parent) => Some(by_name.get(parent).copied().ok_or_else(|| {
                    AbilityError::UnknownParent {
                        name: entry.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
            let value = entry
                .discriminator_value
                .unwrap_or_else(|| entry.name.clone());
            if by_value.insert(value.clone(), type_ref(idx)).is_some() {
                return Err(AbilityError::DuplicateDiscriminatorValue { value });
            }
            if by_name.get(&value).is_some_and(|named: &TypeRef| named.index != idx) {
                return Err(AbilityError::AmbiguousDiscriminatorValue { value });
            }
            nodes.push(TypeNode {
                name: entry.name,
                discriminator_value: value,
                parent,
                children: Vec::new(),
            });
        }

        let parents: Vec<Option<TypeRef>> = nodes.iter().map(|n| n.parent).collect();
        for (idx, parent) in parents.iter().enumerate() {
            let mut current = *parent;
            let mut steps = 0;
            while let Some(p) = current {
                if p.index == idx || steps > nodes.len() {
                    return Err(AbilityError::CyclicHierarchy {
                        name: nodes[idx].name.clone(),
                    });
                }
                current = parents.get(p.index).copied().flatten();
                steps += 1;
            }
            if let Some(p) = parent {
                nodes[p.index].children.push(type_ref(idx));
            }
        }

        tracing::debug!(
            discriminator = %discriminator,
            types = nodes.len(),
            "type hierarchy built"
        );

        Ok(TypeHierarchy {
            id,
            discriminator,
            nodes,
            by_name,
            by_value,
        })
    }
}
