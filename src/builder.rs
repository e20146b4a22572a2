// src/builder.rs

//! Package construction
//!
//! A [`PackageBuilder`] collects directives for one recipe layer. Finishing
//! it flattens the actions inherited from its bases with its own, and for a
//! concrete package replays them against an empty descriptor.
//!
//! ```
//! use pkgmeta::builder::{DependsOnArgs, PackageBuilder};
//!
//! let mut base = PackageBuilder::new("AutotoolsPackage");
//! base.depends_on("autoconf", DependsOnArgs::default().deptype("build"))?;
//! let base = base.finish_layer();
//!
//! let mut pkg = PackageBuilder::new("libelf");
//! pkg.base(&base).version("0.8.13", "4136d7b4c04df68b686570afa26988ac")?;
//! let pkg = pkg.build()?;
//! assert!(pkg.dependencies().contains_key("autoconf"));
//! # Ok::<(), pkgmeta::Error>(())
//! ```

use crate::config::EngineConfig;
use crate::deptype::{DepTypeSpec, DepTypes, canonical_deptype};
use crate::descriptor::{ExtendOptions, PackageDescriptor, VersionMeta};
use crate::directive::{
    Condition, ConflictsDirective, DependencyPatch, DependsOnDirective, Directive,
    ExtendsDirective, PatchDirective, ProvidesDirective, ResourceDirective, VariantDirective,
    VersionDirective,
};
use crate::error::{Error, Result};
use crate::fetch::FetchArgs;
use crate::patch::PatchMeta;
use crate::resource::validate_destination;
use crate::spec::{Spec, Version};
use crate::variant::{GroupValidator, Variant, VariantValue, VariantValues};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Optional arguments of `version`
#[derive(Debug, Clone, Default)]
pub struct VersionArgs {
    pub checksum: Option<String>,
    pub metadata: VersionMeta,
}

impl VersionArgs {
    pub fn checksum(checksum: impl Into<String>) -> Self {
        Self {
            checksum: Some(checksum.into()),
            ..Self::default()
        }
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for VersionArgs {
    fn from(checksum: &str) -> Self {
        Self::checksum(checksum)
    }
}

/// Optional arguments of `patch`, also used for dependency patches
#[derive(Debug, Clone)]
pub struct PatchArgs {
    pub level: u32,
    pub when: Condition,
    pub meta: PatchMeta,
}

impl Default for PatchArgs {
    fn default() -> Self {
        Self {
            level: 1,
            when: Condition::Always,
            meta: PatchMeta::default(),
        }
    }
}

impl PatchArgs {
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn when(mut self, when: impl Into<Condition>) -> Self {
        self.when = when.into();
        self
    }

    pub fn sha256(mut self, sha256: impl Into<String>) -> Self {
        self.meta.sha256 = Some(sha256.into());
        self
    }

    pub fn archive_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.meta.archive_sha256 = Some(sha256.into());
        self
    }

    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.meta.workdir = Some(workdir.into());
        self
    }
}

/// Optional arguments of `depends_on`
#[derive(Debug, Clone, Default)]
pub struct DependsOnArgs {
    pub when: Condition,
    /// `None` selects the configured default types
    pub deptype: Option<DepTypeSpec>,
    pub patches: Vec<(String, PatchArgs)>,
}

impl DependsOnArgs {
    pub fn when(mut self, when: impl Into<Condition>) -> Self {
        self.when = when.into();
        self
    }

    pub fn deptype(mut self, deptype: impl Into<DepTypeSpec>) -> Self {
        self.deptype = Some(deptype.into());
        self
    }

    pub fn patch(mut self, locator: impl Into<String>, args: PatchArgs) -> Self {
        self.patches.push((locator.into(), args));
        self
    }
}

/// Optional arguments of `extends`
#[derive(Debug, Clone, Default)]
pub struct ExtendsArgs {
    pub when: Condition,
    pub options: ExtendOptions,
}

impl ExtendsArgs {
    pub fn when(mut self, when: impl Into<Condition>) -> Self {
        self.when = when.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Optional arguments of `conflicts`
#[derive(Debug, Clone, Default)]
pub struct ConflictsArgs {
    pub when: Condition,
    pub msg: Option<String>,
}

impl ConflictsArgs {
    pub fn when(mut self, when: impl Into<Condition>) -> Self {
        self.when = when.into();
        self
    }

    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }
}

/// Optional arguments of `variant`
#[derive(Clone, Default)]
pub struct VariantArgs {
    pub default: Option<VariantValue>,
    pub description: String,
    pub values: Option<VariantValues>,
    pub multi: bool,
    pub validator: Option<GroupValidator>,
}

impl VariantArgs {
    pub fn default_value(mut self, default: impl Into<VariantValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn values(mut self, values: VariantValues) -> Self {
        self.values = Some(values);
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&[String]) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl std::fmt::Debug for VariantArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantArgs")
            .field("default", &self.default)
            .field("description", &self.description)
            .field("values", &self.values)
            .field("multi", &self.multi)
            .field("validator", &self.validator.as_ref().map(|_| "<validator>"))
            .finish()
    }
}

/// Optional arguments of `resource`
#[derive(Debug, Clone, Default)]
pub struct ResourceArgs {
    pub name: Option<String>,
    pub when: Condition,
    pub destination: String,
    pub placement: Option<String>,
    pub fetch: FetchArgs,
}

impl ResourceArgs {
    pub fn new(fetch: FetchArgs) -> Self {
        Self {
            fetch,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn when(mut self, when: impl Into<Condition>) -> Self {
        self.when = when.into();
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn placement(mut self, placement: impl Into<String>) -> Self {
        self.placement = Some(placement.into());
        self
    }
}

/// The finished action list of a recipe layer
///
/// Layers are what subtypes inherit from. A layer's actions already include
/// everything inherited from its own bases.
#[derive(Debug)]
pub struct Layer {
    name: String,
    bases: Vec<String>,
    actions: Vec<Arc<Directive>>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the direct bases, in declaration order
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Flattened, de-duplicated actions in replay order
    pub fn actions(&self) -> &[Arc<Directive>] {
        &self.actions
    }
}

/// Records directives for one package or abstract layer
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    name: String,
    bases: Vec<Arc<Layer>>,
    pending: Vec<Directive>,
    config: Arc<EngineConfig>,
    recipe_dir: Option<PathBuf>,
}

impl PackageBuilder {
    /// Start a layer named `name` with the default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EngineConfig::shared_default())
    }

    pub fn with_config(name: impl Into<String>, config: Arc<EngineConfig>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            pending: Vec::new(),
            config,
            recipe_dir: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory file patches are resolved against
    pub fn recipe_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.recipe_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Inherit from `layer`; bases are recorded in declaration order
    pub fn base(&mut self, layer: &Arc<Layer>) -> &mut Self {
        self.bases.push(Arc::clone(layer));
        self
    }

    /// Record an already constructed directive
    pub fn directive(&mut self, directive: Directive) -> &mut Self {
        self.pending.push(directive);
        self
    }

    /// Directives recorded so far on this layer, excluding inherited ones
    pub fn pending(&self) -> &[Directive] {
        &self.pending
    }

    fn fail(&self, directive: &str, err: Error) -> Error {
        err.in_directive(&self.name, directive)
    }

    fn condition(&self, directive: &str, when: &Condition) -> Result<Option<Spec>> {
        when.parse().map_err(|e| self.fail(directive, e))
    }

    fn target(&self, directive: &str, expr: &str) -> Result<Spec> {
        let spec = Spec::parse(expr).map_err(|e| self.fail(directive, e))?;
        if spec.name().is_none() {
            return Err(self.fail(
                directive,
                Error::SpecParse {
                    expr: expr.to_string(),
                    reason: "expected a package name".to_string(),
                },
            ));
        }
        Ok(spec)
    }

    fn deptypes(&self, directive: &str, deptype: Option<&DepTypeSpec>) -> Result<DepTypes> {
        let types = match deptype {
            None => self.config.default_deptypes(),
            Some(spec) => canonical_deptype(Some(spec)),
        };
        types.map_err(|e| self.fail(directive, e))
    }

    /// `version(id, checksum=None, **meta)`
    pub fn version(&mut self, id: &str, args: impl Into<VersionArgs>) -> Result<&mut Self> {
        let args = args.into();
        let id = Version::parse(id).map_err(|e| self.fail("version", e))?;
        Ok(self.directive(Directive::Version(VersionDirective {
            id,
            checksum: args.checksum,
            metadata: args.metadata,
        })))
    }

    /// `depends_on(target, when=None, type=None)`
    pub fn depends_on(&mut self, target: &str, args: DependsOnArgs) -> Result<&mut Self> {
        if args.when.is_never() {
            return Ok(self);
        }
        let target = self.target("depends_on", target)?;
        let when = self.condition("depends_on", &args.when)?;
        let types = self.deptypes("depends_on", args.deptype.as_ref())?;

        let mut patches = Vec::with_capacity(args.patches.len());
        for (locator, patch) in args.patches {
            if patch.when.is_never() {
                continue;
            }
            patches.push(DependencyPatch {
                locator,
                level: patch.level,
                when: self.condition("depends_on", &patch.when)?,
                meta: patch.meta,
                recipe_dir: self.recipe_dir.clone(),
            });
        }

        Ok(self.directive(Directive::DependsOn(DependsOnDirective {
            target,
            when,
            types,
            patches,
        })))
    }

    /// `extends(target, when=None, **opts)`
    pub fn extends(&mut self, target: &str, args: ExtendsArgs) -> Result<&mut Self> {
        if args.when.is_never() {
            return Ok(self);
        }
        let target = self.target("extends", target)?;
        let when = self.condition("extends", &args.when)?;
        let types = self.deptypes("extends", None)?;
        Ok(self.directive(Directive::Extends(ExtendsDirective {
            target,
            when,
            types,
            options: args.options,
        })))
    }

    /// `conflicts(expr, when=None, msg=None)`
    pub fn conflicts(&mut self, expr: &str, args: ConflictsArgs) -> Result<&mut Self> {
        if args.when.is_never() {
            return Ok(self);
        }
        let conflict = Spec::parse(expr).map_err(|e| self.fail("conflicts", e))?;
        let when = self.condition("conflicts", &args.when)?;
        Ok(self.directive(Directive::Conflicts(ConflictsDirective {
            conflict,
            when,
            msg: args.msg,
        })))
    }

    /// `provides(*virtuals, when=None)`
    pub fn provides(&mut self, virtuals: &[&str], when: impl Into<Condition>) -> Result<&mut Self> {
        let when = when.into();
        if when.is_never() {
            return Ok(self);
        }
        let virtuals = virtuals
            .iter()
            .map(|expr| self.target("provides", expr))
            .collect::<Result<Vec<_>>>()?;
        let when = self.condition("provides", &when)?;
        Ok(self.directive(Directive::Provides(ProvidesDirective { virtuals, when })))
    }

    /// `patch(locator, level=1, when=None, **meta)`
    pub fn patch(&mut self, locator: &str, args: PatchArgs) -> Result<&mut Self> {
        if args.when.is_never() {
            return Ok(self);
        }
        let when = self.condition("patch", &args.when)?;
        Ok(self.directive(Directive::Patch(PatchDirective {
            locator: locator.to_string(),
            level: args.level,
            when,
            meta: args.meta,
            recipe_dir: self.recipe_dir.clone(),
        })))
    }

    /// `variant(name, default=None, description='', values=None, multi=False, validator=None)`
    pub fn variant(&mut self, name: &str, args: VariantArgs) -> Result<&mut Self> {
        if self.config.is_reserved_variant(name) {
            return Err(self.fail(
                "variant",
                Error::InvalidVariantName(format!("'{}' is a reserved variant name", name)),
            ));
        }

        let values = args
            .values
            .unwrap_or_else(|| VariantValues::infer(args.default.as_ref()));
        let default = args.default.unwrap_or_else(|| values.implied_default());
        let variant = Variant {
            name: name.to_string(),
            default,
            description: args.description,
            values,
            multi: args.multi,
            validator: args.validator,
        };
        Ok(self.directive(Directive::Variant(VariantDirective { variant })))
    }

    /// `resource(name=None, when=None, destination='', placement=None, **fetch)`
    pub fn resource(&mut self, args: ResourceArgs) -> Result<&mut Self> {
        if args.when.is_never() {
            return Ok(self);
        }
        validate_destination(&args.destination, &self.config.directives.stage_root)
            .map_err(|e| self.fail("resource", e))?;
        let when = self.condition("resource", &args.when)?;
        Ok(self.directive(Directive::Resource(ResourceDirective {
            name: args.name,
            when,
            destination: args.destination,
            placement: args.placement,
            fetch: args.fetch,
        })))
    }

    /// Bases' actions in reverse declaration order, then our own, keeping
    /// the first occurrence of each distinct action
    fn flatten(self) -> (Layer, Arc<EngineConfig>) {
        let mut combined: Vec<Arc<Directive>> = Vec::new();
        for base in self.bases.iter().rev() {
            combined.extend(base.actions.iter().cloned());
        }
        combined.extend(self.pending.into_iter().map(Arc::new));

        let mut actions: Vec<Arc<Directive>> = Vec::with_capacity(combined.len());
        for action in combined {
            let seen = actions
                .iter()
                .any(|kept| Arc::ptr_eq(kept, &action) || **kept == *action);
            if !seen {
                actions.push(action);
            }
        }

        let layer = Layer {
            name: self.name,
            bases: self.bases.iter().map(|b| b.name.clone()).collect(),
            actions,
        };
        (layer, self.config)
    }

    /// Finish an abstract layer: actions are kept for subtypes, never replayed
    pub fn finish_layer(self) -> Arc<Layer> {
        let (layer, _) = self.flatten();
        debug!(
            "Finished layer {} with {} action(s)",
            layer.name,
            layer.actions.len()
        );
        Arc::new(layer)
    }

    /// Finish a concrete package: replay every action into a new descriptor
    ///
    /// The first failing action aborts construction; no descriptor is
    /// produced.
    pub fn build(self) -> Result<Package> {
        let (layer, config) = self.flatten();
        let mut descriptor = PackageDescriptor::new(layer.name.clone());

        for action in &layer.actions {
            debug!("{}: applying {}", layer.name, action.name());
            action
                .apply(&mut descriptor, &config)
                .map_err(|e| e.in_directive(&layer.name, action.name()))?;
        }

        info!(
            "Built package {} ({} versions, {} dependencies, {} variants)",
            descriptor.name,
            descriptor.versions.len(),
            descriptor.dependencies.len(),
            descriptor.variants.len()
        );
        Ok(Package {
            layer: Arc::new(layer),
            descriptor,
        })
    }
}

/// A finished concrete package
///
/// Derefs to its read-only [`PackageDescriptor`].
#[derive(Debug)]
pub struct Package {
    layer: Arc<Layer>,
    descriptor: PackageDescriptor,
}

impl Package {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    /// The package's action list, for packages that inherit from it
    pub fn layer(&self) -> &Arc<Layer> {
        &self.layer
    }
}

impl Deref for Package {
    type Target = PackageDescriptor;

    fn deref(&self) -> &PackageDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deptype::DependencyType;

    fn versions(pkg: &Package) -> Vec<String> {
        pkg.versions().keys().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_build_replays_in_declaration_order() {
        let mut b = PackageBuilder::new("mpileaks");
        b.version("1.0", "abc")
            .unwrap()
            .depends_on("mpi", DependsOnArgs::default())
            .unwrap()
            .depends_on("callpath", DependsOnArgs::default().deptype("build"))
            .unwrap();
        let pkg = b.build().unwrap();

        assert_eq!(versions(&pkg), vec!["1.0"]);
        let always = Spec::named("mpileaks");
        assert_eq!(pkg.dependency("mpi", &always).unwrap().types, DepTypes::default_set());
        assert_eq!(
            pkg.dependency("callpath", &always).unwrap().types.to_vec(),
            vec![DependencyType::Build]
        );
    }

    #[test]
    fn test_when_false_is_never_recorded() {
        let mut b = PackageBuilder::new("app");
        b.depends_on("zlib", DependsOnArgs::default().when(false)).unwrap();
        assert!(b.pending().is_empty());
        let pkg = b.build().unwrap();
        assert!(pkg.dependencies().is_empty());
    }

    #[test]
    fn test_bad_deptype_fails_at_call_site() {
        let mut b = PackageBuilder::new("app");
        let err = b
            .depends_on("zlib", DependsOnArgs::default().deptype("test"))
            .unwrap_err();
        assert!(matches!(err.root(), Error::InvalidDependencyType(_)));
        assert!(b.pending().is_empty());
    }

    #[test]
    fn test_inherited_actions_are_not_duplicated() {
        let mut base = PackageBuilder::new("Base");
        base.depends_on("cmake", DependsOnArgs::default().deptype("build"))
            .unwrap();
        let base = base.finish_layer();

        let mut mid = PackageBuilder::new("Mid");
        mid.base(&base);
        let mid = mid.finish_layer();

        let mut pkg = PackageBuilder::new("leaf");
        pkg.base(&base).base(&mid);
        pkg.depends_on("cmake", DependsOnArgs::default().deptype("build"))
            .unwrap();
        let pkg = pkg.build().unwrap();

        assert_eq!(pkg.layer().actions().len(), 1);
        assert_eq!(pkg.layer().bases(), &["Base".to_string(), "Mid".to_string()]);
    }

    #[test]
    fn test_bases_replay_in_reverse_declaration_order() {
        let mut first = PackageBuilder::new("First");
        first.version("1.0", VersionArgs::default()).unwrap();
        let first = first.finish_layer();

        let mut second = PackageBuilder::new("Second");
        second.version("2.0", VersionArgs::default()).unwrap();
        let second = second.finish_layer();

        let mut pkg = PackageBuilder::new("leaf");
        pkg.base(&first).base(&second);
        pkg.version("3.0", VersionArgs::default()).unwrap();
        let pkg = pkg.build().unwrap();

        let order: Vec<String> = pkg
            .layer()
            .actions()
            .iter()
            .map(|a| match a.as_ref() {
                Directive::Version(v) => v.id.to_string(),
                other => other.name().to_string(),
            })
            .collect();
        assert_eq!(order, vec!["2.0", "1.0", "3.0"]);
    }

    #[test]
    fn test_reserved_variant_rejected_at_declaration() {
        let mut b = PackageBuilder::new("app");
        let err = b.variant("patches", VariantArgs::default()).unwrap_err();
        assert!(matches!(err.root(), Error::InvalidVariantName(_)));
    }

    #[test]
    fn test_variant_inference() {
        let mut b = PackageBuilder::new("app");
        b.variant("shared", VariantArgs::default().default_value(true))
            .unwrap()
            .variant("build_type", VariantArgs::default().default_value("Release"))
            .unwrap()
            .variant(
                "fabrics",
                VariantArgs::default()
                    .values(VariantValues::enumerated(["verbs", "psm"]))
                    .multi(true),
            )
            .unwrap();
        let pkg = b.build().unwrap();

        assert_eq!(pkg.variants()["shared"].values, VariantValues::Boolean);
        assert_eq!(pkg.variants()["build_type"].values, VariantValues::Any);
        assert_eq!(pkg.variants()["fabrics"].default, VariantValue::from(""));
    }

    #[test]
    fn test_variant_last_write_wins() {
        let mut b = PackageBuilder::new("app");
        b.variant("mpi", VariantArgs::default().default_value(false))
            .unwrap()
            .variant("mpi", VariantArgs::default().default_value(true))
            .unwrap();
        let pkg = b.build().unwrap();
        assert_eq!(pkg.variants()["mpi"].default, VariantValue::Bool(true));
    }

    #[test]
    fn test_resource_destination_checked_at_declaration() {
        let fetch = FetchArgs {
            url: Some("https://example.com/a.tar.gz".to_string()),
            ..FetchArgs::default()
        };
        let mut b = PackageBuilder::new("app");
        let err = b
            .resource(ResourceArgs::new(fetch.clone()).destination("../out"))
            .unwrap_err();
        assert!(matches!(err.root(), Error::InvalidDestination { .. }));
        b.resource(ResourceArgs::new(fetch).destination("sub/dir"))
            .unwrap();
        let pkg = b.build().unwrap();
        assert_eq!(pkg.resources()[&Spec::named("app")].len(), 1);
    }

    #[test]
    fn test_replay_failure_names_package_and_directive() {
        let mut b = PackageBuilder::new("app");
        b.depends_on("zlib@1.2", DependsOnArgs::default()).unwrap();
        b.depends_on("zlib@1.3", DependsOnArgs::default()).unwrap();
        let err = b.build().unwrap_err();
        match &err {
            Error::Directive {
                package, directive, ..
            } => {
                assert_eq!(package, "app");
                assert_eq!(directive, "depends_on");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(err.root(), Error::IncompatibleConstraint(_)));
    }

    #[test]
    fn test_custom_directive_is_replayed() {
        let mut registry = crate::directive::DirectiveRegistry::builtin();
        let def = registry.register("pin_zlib", "dependencies").unwrap();
        let mut b = PackageBuilder::new("app");
        b.directive(def.action(|desc| {
            desc.depends_on("zlib@1.2", true, DepTypes::default_set())
        }));
        let pkg = b.build().unwrap();
        assert!(pkg.dependencies().contains_key("zlib"));
    }
}
