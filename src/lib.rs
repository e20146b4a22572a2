// src/lib.rs

//! Package metadata core
//!
//! Packages are declared as layers of directives (`version`, `depends_on`,
//! `extends`, `conflicts`, `provides`, `patch`, `variant`, `resource`). A
//! layer inherits the actions of its bases; finishing a concrete package
//! replays every action, in order, into a read-only [`PackageDescriptor`].
//!
//! # Architecture
//!
//! - Directives are recorded values, not immediate mutations
//! - Construction is explicit: a [`PackageBuilder`] per layer, no global queue
//! - Descriptor fields only ever grow or merge during construction
//! - Recipes: TOML files describing layers, loaded into a [`RecipeSet`]

pub mod builder;
pub mod config;
pub mod dependency;
pub mod deptype;
pub mod descriptor;
pub mod directive;
mod error;
pub mod fetch;
pub mod patch;
pub mod recipe;
pub mod resource;
pub mod spec;
pub mod variant;

pub use builder::{
    ConflictsArgs, DependsOnArgs, ExtendsArgs, Layer, Package, PackageBuilder, PatchArgs,
    ResourceArgs, VariantArgs, VersionArgs,
};
pub use config::{EngineConfig, ExtendsPolicy};
pub use dependency::Dependency;
pub use deptype::{DepTypeSpec, DepTypes, DependencyType, canonical_deptype};
pub use descriptor::{Conflict, DescriptorField, PackageDescriptor};
pub use directive::{Condition, DescriptorMut, Directive, DirectiveRegistry};
pub use error::{Error, Result};
pub use recipe::{Recipe, RecipeSet};
pub use spec::{Spec, Version};
pub use variant::{Variant, VariantValue, VariantValues};
