// src/recipe/format.rs

//! Recipe file format definitions
//!
//! A recipe is a TOML file declaring one layer: either a concrete package or
//! an abstract base (such as a build-system class) other recipes inherit
//! from. Directive tables map one-to-one onto builder calls.

use crate::builder::{
    ConflictsArgs, DependsOnArgs, ExtendsArgs, PackageBuilder, PatchArgs, ResourceArgs,
    VariantArgs, VersionArgs,
};
use crate::deptype::DepTypeSpec;
use crate::directive::Condition;
use crate::error::Result;
use crate::fetch::FetchArgs;
use crate::patch::PatchMeta;
use crate::variant::{VariantValue, VariantValues};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete recipe
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Layer metadata
    pub package: PackageSection,

    #[serde(default, rename = "version")]
    pub versions: Vec<VersionEntry>,

    #[serde(default)]
    pub depends_on: Vec<DependsOnEntry>,

    #[serde(default)]
    pub extends: Vec<ExtendsEntry>,

    #[serde(default)]
    pub conflicts: Vec<ConflictsEntry>,

    #[serde(default)]
    pub provides: Vec<ProvidesEntry>,

    #[serde(default, rename = "patch")]
    pub patches: Vec<PatchEntry>,

    #[serde(default, rename = "variant")]
    pub variants: Vec<VariantEntry>,

    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceEntry>,
}

/// The `[package]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,

    /// Abstract layers are only inherited from, never built
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// Layers this one inherits from, in declaration order
    #[serde(default)]
    pub bases: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,
}

/// `[[version]]`: any keys besides `id` and `checksum` become fetch metadata
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,

    #[serde(default)]
    pub checksum: Option<String>,

    #[serde(flatten)]
    pub meta: BTreeMap<String, toml::Value>,
}

/// `[[depends_on]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependsOnEntry {
    pub spec: String,

    #[serde(default)]
    pub when: Condition,

    /// One type name or a list of them
    #[serde(default, rename = "type")]
    pub deptype: Option<DepTypeSpec>,

    /// Patches applied to the dependency's source
    #[serde(default)]
    pub patches: Vec<PatchEntry>,
}

/// `[[extends]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtendsEntry {
    pub spec: String,

    #[serde(default)]
    pub when: Condition,

    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// `[[conflicts]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictsEntry {
    pub spec: String,

    #[serde(default)]
    pub when: Condition,

    #[serde(default)]
    pub msg: Option<String>,
}

/// `[[provides]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidesEntry {
    pub virtuals: Vec<String>,

    #[serde(default)]
    pub when: Condition,
}

fn default_level() -> u32 {
    1
}

/// `[[patch]]`, also nested under `depends_on.patches`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchEntry {
    /// Relative file path or URL
    pub file: String,

    #[serde(default = "default_level")]
    pub level: u32,

    #[serde(default)]
    pub when: Condition,

    #[serde(default)]
    pub sha256: Option<String>,

    #[serde(default)]
    pub archive_sha256: Option<String>,

    #[serde(default)]
    pub workdir: Option<String>,
}

impl PatchEntry {
    /// Remote patches are identified by a URL scheme
    pub fn is_remote(&self) -> bool {
        self.file.contains("://")
    }

    fn to_args(&self) -> PatchArgs {
        PatchArgs {
            level: self.level,
            when: self.when.clone(),
            meta: PatchMeta {
                sha256: self.sha256.clone(),
                archive_sha256: self.archive_sha256.clone(),
                workdir: self.workdir.clone(),
            },
        }
    }
}

/// `[[variant]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantEntry {
    pub name: String,

    #[serde(default)]
    pub default: Option<VariantValue>,

    #[serde(default)]
    pub description: String,

    /// Allowed values; omitted means inferred from the default
    #[serde(default)]
    pub values: Option<Vec<String>>,

    #[serde(default)]
    pub multi: bool,
}

/// `[[resource]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub when: Condition,

    #[serde(default)]
    pub destination: String,

    #[serde(default)]
    pub placement: Option<String>,

    /// Where to fetch the resource from
    pub fetch: FetchArgs,
}

fn meta_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Recipe {
    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn is_abstract(&self) -> bool {
        self.package.is_abstract
    }

    pub fn bases(&self) -> impl Iterator<Item = &str> {
        self.package.bases.iter().map(String::as_str)
    }

    /// Number of directive entries in the recipe
    pub fn directive_count(&self) -> usize {
        self.versions.len()
            + self.depends_on.len()
            + self.extends.len()
            + self.conflicts.len()
            + self.provides.len()
            + self.patches.len()
            + self.variants.len()
            + self.resources.len()
    }

    /// Record every directive of this recipe on `builder`
    ///
    /// Tables are declared in a fixed order (versions, variants,
    /// dependencies, extensions, provided virtuals, conflicts, patches,
    /// resources), each in file order.
    pub fn declare(&self, builder: &mut PackageBuilder) -> Result<()> {
        for entry in &self.versions {
            let mut args = VersionArgs {
                checksum: entry.checksum.clone(),
                ..VersionArgs::default()
            };
            for (key, value) in &entry.meta {
                args = args.meta(key.as_str(), meta_value(value));
            }
            builder.version(&entry.id, args)?;
        }

        for entry in &self.variants {
            let mut args = VariantArgs::default()
                .description(entry.description.as_str())
                .multi(entry.multi);
            args.default = entry.default.clone();
            if let Some(values) = &entry.values {
                args = args.values(VariantValues::enumerated(values.iter().cloned()));
            }
            builder.variant(&entry.name, args)?;
        }

        for entry in &self.depends_on {
            let mut args = DependsOnArgs {
                when: entry.when.clone(),
                deptype: entry.deptype.clone(),
                patches: Vec::new(),
            };
            for patch in &entry.patches {
                args = args.patch(patch.file.as_str(), patch.to_args());
            }
            builder.depends_on(&entry.spec, args)?;
        }

        for entry in &self.extends {
            let args = ExtendsArgs {
                when: entry.when.clone(),
                options: entry.options.clone(),
            };
            builder.extends(&entry.spec, args)?;
        }

        for entry in &self.provides {
            let virtuals: Vec<&str> = entry.virtuals.iter().map(String::as_str).collect();
            builder.provides(&virtuals, entry.when.clone())?;
        }

        for entry in &self.conflicts {
            let args = ConflictsArgs {
                when: entry.when.clone(),
                msg: entry.msg.clone(),
            };
            builder.conflicts(&entry.spec, args)?;
        }

        for entry in &self.patches {
            builder.patch(&entry.file, entry.to_args())?;
        }

        for entry in &self.resources {
            let args = ResourceArgs {
                name: entry.name.clone(),
                when: entry.when.clone(),
                destination: entry.destination.clone(),
                placement: entry.placement.clone(),
                fetch: entry.fetch.clone(),
            };
            builder.resource(args)?;
        }

        Ok(())
    }
}
