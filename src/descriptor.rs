// src/descriptor.rs

//! Package descriptors
//!
//! The descriptor is the normalized record a package's directives produce.
//! Every field starts empty and only ever grows or merges while directives
//! are replayed; once construction finishes it is exposed read-only.

use crate::dependency::Dependency;
use crate::patch::Patch;
use crate::resource::Resource;
use crate::spec::{Spec, Version};
use crate::variant::Variant;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Fetch metadata recorded for one version
pub type VersionMeta = BTreeMap<String, String>;

/// Extra options passed to an extendee's extension mechanism
pub type ExtendOptions = BTreeMap<String, String>;

/// Key under which a version's positional checksum is stored
pub const CHECKSUM_KEY: &str = "md5";

/// The descriptor fields directives can affect
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum DescriptorField {
    Versions,
    Dependencies,
    Conflicts,
    Provided,
    Variants,
    Patches,
    Resources,
    Extendees,
}

/// A known-bad configuration and the condition that triggers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub when: Spec,
    pub msg: Option<String>,
}

/// The merged metadata of one package
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub(crate) name: String,
    pub(crate) versions: BTreeMap<Version, VersionMeta>,
    pub(crate) dependencies: BTreeMap<String, BTreeMap<Spec, Dependency>>,
    pub(crate) conflicts: BTreeMap<Spec, Vec<Conflict>>,
    pub(crate) provided: BTreeMap<Spec, BTreeSet<Spec>>,
    pub(crate) variants: BTreeMap<String, Variant>,
    pub(crate) patches: BTreeMap<Spec, Vec<Patch>>,
    pub(crate) resources: BTreeMap<Spec, Vec<Resource>>,
    pub(crate) extendees: BTreeMap<String, (Spec, ExtendOptions)>,
}

impl PackageDescriptor {
    /// An empty descriptor for package `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &BTreeMap<Version, VersionMeta> {
        &self.versions
    }

    pub fn dependencies(&self) -> &BTreeMap<String, BTreeMap<Spec, Dependency>> {
        &self.dependencies
    }

    pub fn conflicts(&self) -> &BTreeMap<Spec, Vec<Conflict>> {
        &self.conflicts
    }

    pub fn provided(&self) -> &BTreeMap<Spec, BTreeSet<Spec>> {
        &self.provided
    }

    pub fn variants(&self) -> &BTreeMap<String, Variant> {
        &self.variants
    }

    pub fn patches(&self) -> &BTreeMap<Spec, Vec<Patch>> {
        &self.patches
    }

    pub fn resources(&self) -> &BTreeMap<Spec, Vec<Resource>> {
        &self.resources
    }

    pub fn extendees(&self) -> &BTreeMap<String, (Spec, ExtendOptions)> {
        &self.extendees
    }

    /// The dependency on `target` recorded under `condition`
    pub fn dependency(&self, target: &str, condition: &Spec) -> Option<&Dependency> {
        self.dependencies.get(target)?.get(condition)
    }

    /// Whether this package provides the virtual `name` under any condition
    pub fn provides(&self, name: &str) -> bool {
        self.provided.keys().any(|v| v.name() == Some(name))
    }

    /// Number of entries recorded in `field`
    pub fn field_len(&self, field: DescriptorField) -> usize {
        match field {
            DescriptorField::Versions => self.versions.len(),
            DescriptorField::Dependencies => self.dependencies.len(),
            DescriptorField::Conflicts => self.conflicts.len(),
            DescriptorField::Provided => self.provided.len(),
            DescriptorField::Variants => self.variants.len(),
            DescriptorField::Patches => self.patches.len(),
            DescriptorField::Resources => self.resources.len(),
            DescriptorField::Extendees => self.extendees.len(),
        }
    }
}
