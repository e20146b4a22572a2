// src/directive/builtin.rs

//! Built-in directives and their replay logic
//!
//! Each directive carries the arguments that were validated and normalized
//! when it was declared. Replay only anchors conditions on the package being
//! built and writes into the matching descriptor field.

use super::anchor_condition;
use crate::config::{EngineConfig, ExtendsPolicy};
use crate::dependency::Dependency;
use crate::deptype::DepTypes;
use crate::descriptor::{CHECKSUM_KEY, Conflict, ExtendOptions, PackageDescriptor, VersionMeta};
use crate::error::{Error, Result};
use crate::fetch::{FetchArgs, FetchStrategy};
use crate::patch::{Patch, PatchMeta};
use crate::resource::Resource;
use crate::spec::{Spec, Version};
use crate::variant::{Variant, is_valid_identifier};
use std::path::PathBuf;
use tracing::{trace, warn};

/// `version`: a known version and how to fetch it
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDirective {
    pub id: Version,
    /// Positional checksum, stored under [`CHECKSUM_KEY`]
    pub checksum: Option<String>,
    pub metadata: VersionMeta,
}

impl VersionDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let mut meta = self.metadata.clone();
        if let Some(checksum) = &self.checksum {
            meta.insert(CHECKSUM_KEY.to_string(), checksum.clone());
        }
        descriptor.versions.insert(self.id.clone(), meta);
        Ok(())
    }
}

/// A patch applied to a dependency's source
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPatch {
    pub locator: String,
    pub level: u32,
    /// Condition anchored on the dependency, not the declaring package
    pub when: Option<Spec>,
    pub meta: PatchMeta,
    pub recipe_dir: Option<PathBuf>,
}

/// `depends_on`: a requirement on another package
#[derive(Debug, Clone, PartialEq)]
pub struct DependsOnDirective {
    pub target: Spec,
    pub when: Option<Spec>,
    pub types: DepTypes,
    pub patches: Vec<DependencyPatch>,
}

impl DependsOnDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        record_dependency(descriptor, &self.target, &self.when, &self.types, &self.patches)
    }
}

fn target_name(target: &Spec) -> Result<&str> {
    target.name().ok_or_else(|| Error::SpecParse {
        expr: target.to_string(),
        reason: "dependency target must name a package".to_string(),
    })
}

/// Insert or merge a dependency under its anchored condition
fn record_dependency(
    descriptor: &mut PackageDescriptor,
    target: &Spec,
    when: &Option<Spec>,
    types: &DepTypes,
    patches: &[DependencyPatch],
) -> Result<()> {
    let dep_name = target_name(target)?;
    if dep_name == descriptor.name {
        return Err(Error::CircularReference(format!(
            "package '{}' cannot depend on itself",
            dep_name
        )));
    }

    let condition = anchor_condition(when, &descriptor.name)?;
    let mut dependency = Dependency::new(target.clone(), types.clone());
    for patch in patches {
        let patch_condition = anchor_condition(&patch.when, dep_name)?;
        let record = Patch::create(
            dep_name,
            &patch.locator,
            patch.level,
            &patch.meta,
            patch.recipe_dir.as_deref(),
        )?;
        dependency.add_patch(patch_condition, record);
    }

    let by_condition = descriptor
        .dependencies
        .entry(dep_name.to_string())
        .or_default();
    match by_condition.get_mut(&condition) {
        Some(existing) => {
            trace!("Merging dependency on {} under {}", dep_name, condition);
            existing.merge(&dependency)?;
        }
        None => {
            by_condition.insert(condition, dependency);
        }
    }
    Ok(())
}

/// `extends`: a dependency on a package this one is an extension of
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendsDirective {
    pub target: Spec,
    pub when: Option<Spec>,
    pub types: DepTypes,
    pub options: ExtendOptions,
}

impl ExtendsDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor, config: &EngineConfig) -> Result<()> {
        let name = target_name(&self.target)?.to_string();

        let other = descriptor
            .extendees
            .keys()
            .find(|existing| **existing != name)
            .cloned();
        if let Some(existing) = other {
            match config.directives.extends_policy {
                ExtendsPolicy::Reject => {
                    return Err(Error::MultipleExtendees {
                        package: descriptor.name.clone(),
                        existing,
                        requested: name,
                    });
                }
                ExtendsPolicy::Ignore => {
                    warn!(
                        "{} already extends {}; treating extends({}) as a plain dependency",
                        descriptor.name, existing, name
                    );
                    return record_dependency(descriptor, &self.target, &self.when, &self.types, &[]);
                }
            }
        }

        record_dependency(descriptor, &self.target, &self.when, &self.types, &[])?;

        let entry = descriptor
            .extendees
            .entry(name)
            .or_insert_with(|| (self.target.clone(), ExtendOptions::new()));
        entry.0 = self.target.clone();
        entry
            .1
            .extend(self.options.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

/// `conflicts`: a configuration known not to work
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictsDirective {
    /// The conflicting expression, stored literally as the key
    pub conflict: Spec,
    pub when: Option<Spec>,
    pub msg: Option<String>,
}

impl ConflictsDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let when = anchor_condition(&self.when, &descriptor.name)?;
        let record = Conflict {
            when,
            msg: self.msg.clone(),
        };
        let entries = descriptor
            .conflicts
            .entry(self.conflict.clone())
            .or_default();
        if !entries.contains(&record) {
            entries.push(record);
        }
        Ok(())
    }
}

/// `provides`: virtual packages this package can stand in for
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidesDirective {
    pub virtuals: Vec<Spec>,
    pub when: Option<Spec>,
}

impl ProvidesDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let condition = anchor_condition(&self.when, &descriptor.name)?;
        for provided in &self.virtuals {
            if provided.name() == Some(descriptor.name.as_str()) {
                return Err(Error::CircularReference(format!(
                    "package '{}' cannot provide itself",
                    descriptor.name
                )));
            }
            descriptor
                .provided
                .entry(provided.clone())
                .or_default()
                .insert(condition.clone());
        }
        Ok(())
    }
}

/// `patch`: a patch applied to this package's own source
#[derive(Debug, Clone, PartialEq)]
pub struct PatchDirective {
    pub locator: String,
    pub level: u32,
    pub when: Option<Spec>,
    pub meta: PatchMeta,
    /// Directory of the recipe that declared the patch
    pub recipe_dir: Option<PathBuf>,
}

impl PatchDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let condition = anchor_condition(&self.when, &descriptor.name)?;
        let patch = Patch::create(
            &descriptor.name,
            &self.locator,
            self.level,
            &self.meta,
            self.recipe_dir.as_deref(),
        )?;
        descriptor.patches.entry(condition).or_default().push(patch);
        Ok(())
    }
}

/// `variant`: a build option
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDirective {
    pub variant: Variant,
}

impl VariantDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let name = &self.variant.name;
        if !is_valid_identifier(name) {
            return Err(Error::InvalidVariantName(format!(
                "'{}' is not a valid variant identifier",
                name
            )));
        }
        descriptor.variants.insert(name.clone(), self.variant.clone());
        Ok(())
    }
}

/// `resource`: an extra source staged inside the package's stage
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDirective {
    pub name: Option<String>,
    pub when: Option<Spec>,
    pub destination: String,
    pub placement: Option<String>,
    pub fetch: FetchArgs,
}

impl ResourceDirective {
    pub(crate) fn apply(&self, descriptor: &mut PackageDescriptor) -> Result<()> {
        let condition = anchor_condition(&self.when, &descriptor.name)?;
        let fetcher = FetchStrategy::from_args(&self.fetch)?;
        descriptor
            .resources
            .entry(condition)
            .or_default()
            .push(Resource {
                name: self.name.clone(),
                fetcher,
                destination: self.destination.clone(),
                placement: self.placement.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deptype::DependencyType;

    fn depends_on(target: &str, when: Option<&str>, types: &[DependencyType]) -> DependsOnDirective {
        DependsOnDirective {
            target: Spec::parse(target).unwrap(),
            when: when.map(|w| Spec::parse(w).unwrap()),
            types: types.iter().copied().collect(),
            patches: Vec::new(),
        }
    }

    #[test]
    fn test_version_folds_checksum() {
        let mut desc = PackageDescriptor::new("zlib");
        let directive = VersionDirective {
            id: Version::parse("1.2.11").unwrap(),
            checksum: Some("abc".to_string()),
            metadata: VersionMeta::from([("url".to_string(), "http://x".to_string())]),
        };
        directive.apply(&mut desc).unwrap();
        let meta = &desc.versions()[&Version::parse("1.2.11").unwrap()];
        assert_eq!(meta[CHECKSUM_KEY], "abc");
        assert_eq!(meta["url"], "http://x");
    }

    #[test]
    fn test_depends_on_merges_same_condition() {
        let mut desc = PackageDescriptor::new("app");
        depends_on("mpich", None, &[DependencyType::Build])
            .apply(&mut desc)
            .unwrap();
        depends_on("mpich@2:", None, &[DependencyType::Link])
            .apply(&mut desc)
            .unwrap();
        depends_on("mpich", Some("+mpi"), &[DependencyType::Run])
            .apply(&mut desc)
            .unwrap();

        let always = Spec::named("app");
        let dep = desc.dependency("mpich", &always).unwrap();
        assert_eq!(dep.types, DepTypes::default_set());
        assert_eq!(dep.target.to_string(), "mpich@2:");
        assert_eq!(desc.dependencies()["mpich"].len(), 2);
    }

    #[test]
    fn test_depends_on_self_is_circular() {
        let mut desc = PackageDescriptor::new("app");
        let err = depends_on("app@1:", None, &[DependencyType::Build])
            .apply(&mut desc)
            .unwrap_err();
        assert!(matches!(err, Error::CircularReference(_)));
    }

    #[test]
    fn test_dependency_patches_anchor_on_dependency() {
        let mut desc = PackageDescriptor::new("app");
        let mut directive = depends_on("libelf", None, &[DependencyType::Build]);
        directive.patches.push(DependencyPatch {
            locator: "fix.patch".to_string(),
            level: 1,
            when: Some(Spec::parse("@0.8").unwrap()),
            meta: PatchMeta::default(),
            recipe_dir: None,
        });
        directive.apply(&mut desc).unwrap();

        let dep = desc.dependency("libelf", &Spec::named("app")).unwrap();
        let cond = Spec::anonymous("@0.8", "libelf").unwrap();
        assert_eq!(dep.patches[&cond][0].owner, "libelf");
    }

    #[test]
    fn test_extends_policies() {
        let extends = |name: &str, opt: &str| ExtendsDirective {
            target: Spec::parse(name).unwrap(),
            when: None,
            types: DepTypes::default_set(),
            options: ExtendOptions::from([("ignore".to_string(), opt.to_string())]),
        };

        let config = EngineConfig::default();
        let mut desc = PackageDescriptor::new("py-numpy");
        extends("python", "a").apply(&mut desc, &config).unwrap();
        extends("python@3:", "b").apply(&mut desc, &config).unwrap();
        assert_eq!(desc.extendees()["python"].1["ignore"], "b");
        let err = extends("perl", "c").apply(&mut desc, &config).unwrap_err();
        assert!(matches!(err, Error::MultipleExtendees { .. }));

        let mut config = EngineConfig::default();
        config.directives.extends_policy = ExtendsPolicy::Ignore;
        extends("perl", "c").apply(&mut desc, &config).unwrap();
        assert_eq!(desc.extendees().len(), 1);
        assert!(desc.dependencies().contains_key("perl"));
    }

    #[test]
    fn test_conflicts_skip_identical() {
        let mut desc = PackageDescriptor::new("app");
        let directive = ConflictsDirective {
            conflict: Spec::parse("%intel").unwrap(),
            when: None,
            msg: Some("broken".to_string()),
        };
        directive.apply(&mut desc).unwrap();
        directive.apply(&mut desc).unwrap();
        assert_eq!(desc.conflicts()[&Spec::parse("%intel").unwrap()].len(), 1);
    }

    #[test]
    fn test_provides_records_conditions() {
        let mut desc = PackageDescriptor::new("mpich");
        let directive = ProvidesDirective {
            virtuals: vec![Spec::parse("mpi@:3").unwrap()],
            when: Some(Spec::parse("@3:").unwrap()),
        };
        directive.apply(&mut desc).unwrap();
        assert!(desc.provides("mpi"));

        let circular = ProvidesDirective {
            virtuals: vec![Spec::named("mpich")],
            when: None,
        };
        assert!(matches!(
            circular.apply(&mut desc),
            Err(Error::CircularReference(_))
        ));
    }

    #[test]
    fn test_variant_identifier_checked_on_replay() {
        let mut desc = PackageDescriptor::new("app");
        let variant = Variant {
            name: "bad name".to_string(),
            default: false.into(),
            description: String::new(),
            values: crate::variant::VariantValues::Boolean,
            multi: false,
            validator: None,
        };
        let err = VariantDirective { variant }.apply(&mut desc).unwrap_err();
        assert!(matches!(err, Error::InvalidVariantName(_)));
    }

    #[test]
    fn test_resource_builds_fetcher() {
        let mut desc = PackageDescriptor::new("app");
        let directive = ResourceDirective {
            name: Some("data".to_string()),
            when: None,
            destination: "share".to_string(),
            placement: None,
            fetch: FetchArgs {
                git: Some("https://example.com/data.git".to_string()),
                tag: Some("v1".to_string()),
                ..FetchArgs::default()
            },
        };
        directive.apply(&mut desc).unwrap();
        let resources = &desc.resources()[&Spec::named("app")];
        assert_eq!(resources[0].destination, "share");
        assert!(matches!(resources[0].fetcher, FetchStrategy::Git { .. }));
    }
}
