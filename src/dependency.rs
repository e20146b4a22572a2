// src/dependency.rs

//! Dependency requirements declared by a package
//!
//! A [`Dependency`] is one package's requirement on another under one
//! condition. Repeated declarations for the same target and condition merge
//! into the existing record instead of replacing it.

use crate::deptype::DepTypes;
use crate::error::Result;
use crate::patch::Patch;
use crate::spec::Spec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Patches keyed by the condition under which they apply
pub type PatchMap = BTreeMap<Spec, Vec<Patch>>;

/// A requirement on another package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// The depended-on package and the constraints on it
    pub target: Spec,
    /// How the dependency is used
    pub types: DepTypes,
    /// Patches applied to the dependency's source for this requirement
    pub patches: PatchMap,
}

impl Dependency {
    /// Create a dependency with no patches
    pub fn new(target: Spec, types: DepTypes) -> Self {
        Self {
            target,
            types,
            patches: PatchMap::new(),
        }
    }

    /// Name of the depended-on package
    pub fn name(&self) -> Option<&str> {
        self.target.name()
    }

    /// Append a patch under `condition`, after any already recorded there
    pub fn add_patch(&mut self, condition: Spec, patch: Patch) {
        self.patches.entry(condition).or_default().push(patch);
    }

    /// Merge constraints, types and patches of `other` into `self`
    ///
    /// The target is narrowed first; if that fails nothing is changed and
    /// the incompatibility is returned.
    pub fn merge(&mut self, other: &Dependency) -> Result<()> {
        self.target.constrain(&other.target)?;
        self.types.union_with(&other.types);

        for (condition, patches) in &other.patches {
            self.patches
                .entry(condition.clone())
                .or_default()
                .extend(patches.iter().cloned());
        }
        Ok(())
    }
}
