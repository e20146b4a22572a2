// src/recipe/mod.rs

//! Recipe files
//!
//! Recipes declare package layers in TOML. Each directive table maps onto
//! the builder call of the same name:
//!
//! ```toml
//! [package]
//! name = "py-numpy"
//! bases = ["PythonPackage"]
//!
//! [[version]]
//! id = "1.13.1"
//! checksum = "2c3c0f4edf720c3a7b525dacc825b9ae"
//!
//! [[variant]]
//! name = "blas"
//! default = true
//!
//! [[depends_on]]
//! spec = "openblas"
//! when = "+blas"
//! type = ["build", "run"]
//!
//! [[extends]]
//! spec = "python"
//! ```
//!
//! Recipes marked `abstract = true` are only inherited from. A directory of
//! recipes is loaded into a [`RecipeSet`], which finishes base layers before
//! the packages inheriting from them.

mod format;
pub mod graph;
pub mod parser;
mod set;

pub use format::{
    ConflictsEntry, DependsOnEntry, ExtendsEntry, PackageSection, PatchEntry, ProvidesEntry,
    Recipe, ResourceEntry, VariantEntry, VersionEntry,
};
pub use graph::LayerGraph;
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use set::{BuildReport, RecipeSet};
