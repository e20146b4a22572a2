// src/directive/mod.rs

//! Directives
//!
//! A directive is a recorded declaration about a package ("depends on mpi",
//! "has version 1.2"). Builders record directives while a recipe layer is
//! being declared; once the layer is finished they are replayed in order
//! against an empty [`PackageDescriptor`](crate::descriptor::PackageDescriptor).
//!
//! Directives are plain values with structural equality so that actions
//! inherited through several bases can be de-duplicated.

mod builtin;
mod custom;
pub mod registry;

pub use builtin::{
    ConflictsDirective, DependencyPatch, DependsOnDirective, ExtendsDirective, PatchDirective,
    ProvidesDirective, ResourceDirective, VariantDirective, VersionDirective,
};
pub use custom::{CustomAction, CustomDirective, DescriptorMut};
pub use registry::{DirectiveDef, DirectiveRegistry, FieldSet, FieldsArg, BUILTIN_DIRECTIVES};

use crate::config::EngineConfig;
use crate::descriptor::{DescriptorField, PackageDescriptor};
use crate::error::Result;
use crate::spec::Spec;
use serde::{Deserialize, Deserializer};

/// When a directive applies, as written by the recipe author
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Condition {
    /// No condition: always applies to the package itself
    #[default]
    Always,
    /// Explicitly disabled; the directive is dropped at declaration
    Never,
    /// A constraint expression anchored on the declaring package
    Expr(String),
}

impl Condition {
    /// Parse the expression, `None` meaning unconditional
    ///
    /// Must not be called on [`Condition::Never`]; builders drop those first.
    pub(crate) fn parse(&self) -> Result<Option<Spec>> {
        match self {
            Self::Always | Self::Never => Ok(None),
            Self::Expr(expr) if is_flag(expr, "") || is_flag(expr, "true") => Ok(None),
            Self::Expr(expr) => Spec::parse(expr).map(Some),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }
}

fn is_flag(expr: &str, flag: &str) -> bool {
    expr.trim().eq_ignore_ascii_case(flag)
}

impl From<&str> for Condition {
    fn from(expr: &str) -> Self {
        Self::from(expr.to_string())
    }
}

impl From<String> for Condition {
    /// `"false"` in any case disables the directive like `false` does
    fn from(expr: String) -> Self {
        if is_flag(&expr, "false") {
            Self::Never
        } else {
            Self::Expr(expr)
        }
    }
}

impl From<bool> for Condition {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Always } else { Self::Never }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Expr(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Self::from(flag),
            Raw::Expr(expr) => Self::from(expr),
        })
    }
}

/// Anchor an optional parsed condition on `owner`
pub(crate) fn anchor_condition(when: &Option<Spec>, owner: &str) -> Result<Spec> {
    match when {
        Some(spec) => spec.clone().anchor(owner),
        None => Ok(Spec::named(owner)),
    }
}

/// A recorded declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Version(VersionDirective),
    DependsOn(DependsOnDirective),
    Extends(ExtendsDirective),
    Conflicts(ConflictsDirective),
    Provides(ProvidesDirective),
    Patch(PatchDirective),
    Variant(VariantDirective),
    Resource(ResourceDirective),
    Custom(CustomDirective),
}

impl Directive {
    /// The directive's registered name
    pub fn name(&self) -> &str {
        match self {
            Self::Version(_) => "version",
            Self::DependsOn(_) => "depends_on",
            Self::Extends(_) => "extends",
            Self::Conflicts(_) => "conflicts",
            Self::Provides(_) => "provides",
            Self::Patch(_) => "patch",
            Self::Variant(_) => "variant",
            Self::Resource(_) => "resource",
            Self::Custom(custom) => &custom.name,
        }
    }

    /// Descriptor fields this directive may change
    pub fn affected_fields(&self) -> FieldSet {
        match self {
            Self::Custom(custom) => custom.fields.clone(),
            builtin => {
                let fields = BUILTIN_DIRECTIVES
                    .iter()
                    .find(|info| info.name == builtin.name())
                    .map(|info| info.fields)
                    .unwrap_or(&[]);
                FieldSet::of(fields)
            }
        }
    }

    /// Whether replaying this directive can change `field`
    pub fn affects(&self, field: DescriptorField) -> bool {
        self.affected_fields().contains(field)
    }

    /// Replay the directive against `descriptor`
    pub fn apply(&self, descriptor: &mut PackageDescriptor, config: &EngineConfig) -> Result<()> {
        match self {
            Self::Version(d) => d.apply(descriptor),
            Self::DependsOn(d) => d.apply(descriptor),
            Self::Extends(d) => d.apply(descriptor, config),
            Self::Conflicts(d) => d.apply(descriptor),
            Self::Provides(d) => d.apply(descriptor),
            Self::Patch(d) => d.apply(descriptor),
            Self::Variant(d) => d.apply(descriptor),
            Self::Resource(d) => d.apply(descriptor),
            Self::Custom(d) => d.apply(descriptor, config),
        }
    }
}
