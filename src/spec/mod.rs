// src/spec/mod.rs

//! Constraint expressions over packages
//!
//! A [`Spec`] names a package (or leaves the name implied) and narrows it by
//! version, variant settings, compiler and constraints on its own
//! dependencies. Specs are plain values: equality, hashing and ordering are
//! structural, so two conditions written the same way are the same map key.
//!
//! # Example
//!
//! ```
//! use pkgmeta::spec::Spec;
//!
//! let mut spec = Spec::parse("libdwarf@20111030:").unwrap();
//! spec.constrain(&Spec::parse("libdwarf+shared").unwrap()).unwrap();
//! assert_eq!(spec.to_string(), "libdwarf@20111030:+shared");
//! assert!(spec.constrain(&Spec::parse("libdwarf@:2010").unwrap()).is_err());
//! ```

mod parser;
pub mod version;

pub use version::{Version, VersionList, VersionRange};

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How an expression sets one variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantSetting {
    /// `+name` or `~name`
    Enabled(bool),
    /// `name=a,b`, values kept sorted
    Values(Vec<String>),
}

impl VariantSetting {
    /// Interpret the right-hand side of `name=value`
    pub fn from_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "true" => Self::Enabled(true),
            "false" => Self::Enabled(false),
            _ => {
                let mut values: Vec<String> = value
                    .split(',')
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                values.sort();
                values.dedup();
                Self::Values(values)
            }
        }
    }
}

/// A compiler constraint, `%gcc@4.9:`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilerSpec {
    pub name: String,
    pub versions: VersionList,
}

impl fmt::Display for CompilerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        Ok(())
    }
}

/// A constraint expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Spec {
    name: Option<String>,
    versions: VersionList,
    variants: BTreeMap<String, VariantSetting>,
    compiler: Option<CompilerSpec>,
    dependencies: BTreeMap<String, Spec>,
}

impl Spec {
    /// Parse a constraint expression
    pub fn parse(expr: &str) -> Result<Self> {
        parser::parse(expr)
    }

    /// An unconstrained expression naming `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parse `expr` as a condition anchored on package `owner`
    ///
    /// An empty expression means "always" for `owner`. An expression without
    /// a package name (`@1.0`, `+mpi`, `%gcc`) applies to `owner` itself. An
    /// expression naming another package becomes a constraint on `owner`'s
    /// dependency of that name.
    pub fn anonymous(expr: &str, owner: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::named(owner));
        }
        Self::parse(expr)?.anchor(owner)
    }

    /// Anchor an already parsed condition on package `owner`
    ///
    /// Same rules as [`Spec::anonymous`]; an empty spec becomes `owner`.
    pub fn anchor(mut self, owner: &str) -> Result<Self> {
        match self.name.as_deref() {
            None => {
                self.name = Some(owner.to_string());
                Ok(self)
            }
            Some(name) if name == owner => Ok(self),
            Some(_) => {
                let mut anchored = Self::named(owner);
                let nested = std::mem::take(&mut self.dependencies);
                anchored.add_dependency(self)?;
                for (_, dep) in nested {
                    anchored.add_dependency(dep)?;
                }
                Ok(anchored)
            }
        }
    }

    fn add_dependency(&mut self, dep: Spec) -> Result<()> {
        let Some(name) = dep.name.clone() else {
            return Err(Error::SpecParse {
                expr: dep.to_string(),
                reason: "dependency constraint must be named".to_string(),
            });
        };
        match self.dependencies.get_mut(&name) {
            Some(existing) => existing.constrain(&dep),
            None => {
                self.dependencies.insert(name, dep);
                Ok(())
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn versions(&self) -> &VersionList {
        &self.versions
    }

    pub fn compiler(&self) -> Option<&CompilerSpec> {
        self.compiler.as_ref()
    }

    pub fn variant(&self, name: &str) -> Option<&VariantSetting> {
        self.variants.get(name)
    }

    pub fn variants(&self) -> impl Iterator<Item = (&str, &VariantSetting)> {
        self.variants.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn dependency(&self, name: &str) -> Option<&Spec> {
        self.dependencies.get(name)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Spec> {
        self.dependencies.values()
    }

    /// Whether this expression asks for variant `name` to be on or set
    pub fn requires_variant(&self, name: &str) -> bool {
        match self.variants.get(name) {
            Some(VariantSetting::Enabled(on)) => *on,
            Some(VariantSetting::Values(values)) => !values.is_empty(),
            None => false,
        }
    }

    /// Whether `version` is admitted by this expression
    pub fn admits_version(&self, version: &Version) -> bool {
        self.versions.contains(version)
    }

    /// Whether `self` is unconstrained apart from its name
    pub fn is_bare(&self) -> bool {
        self.versions.is_any()
            && self.variants.is_empty()
            && self.compiler.is_none()
            && self.dependencies.is_empty()
    }

    /// Narrow `self` with every constraint of `other`
    ///
    /// Fails with [`Error::IncompatibleConstraint`] when no configuration
    /// can satisfy both; `self` is left unchanged in that case.
    pub fn constrain(&mut self, other: &Spec) -> Result<()> {
        let mut merged = self.clone();
        merged.constrain_in_place(other).map_err(|reason| {
            Error::IncompatibleConstraint(format!("'{}' and '{}': {}", self, other, reason))
        })?;
        *self = merged;
        Ok(())
    }

    fn constrain_in_place(&mut self, other: &Spec) -> std::result::Result<(), String> {
        if let Some(theirs) = &other.name {
            match &self.name {
                Some(mine) if mine != theirs => {
                    return Err(format!("package names differ ({} vs {})", mine, theirs));
                }
                Some(_) => {}
                None => self.name = Some(theirs.clone()),
            }
        }

        self.versions = self
            .versions
            .intersect(&other.versions)
            .ok_or_else(|| format!("versions {} and {} do not overlap", self.versions, other.versions))?;

        for (name, setting) in &other.variants {
            match self.variants.get(name) {
                Some(existing) if existing != setting => {
                    return Err(format!("variant '{}' is set both ways", name));
                }
                Some(_) => {}
                None => {
                    self.variants.insert(name.clone(), setting.clone());
                }
            }
        }

        if let Some(theirs) = &other.compiler {
            match &mut self.compiler {
                Some(mine) => {
                    if mine.name != theirs.name {
                        return Err(format!("compilers differ ({} vs {})", mine.name, theirs.name));
                    }
                    mine.versions = mine.versions.intersect(&theirs.versions).ok_or_else(|| {
                        format!(
                            "compiler versions {} and {} do not overlap",
                            mine.versions, theirs.versions
                        )
                    })?;
                }
                None => self.compiler = Some(theirs.clone()),
            }
        }

        for (name, dep) in &other.dependencies {
            match self.dependencies.get_mut(name) {
                Some(existing) => existing.constrain_in_place(dep)?,
                None => {
                    self.dependencies.insert(name.clone(), dep.clone());
                }
            }
        }

        Ok(())
    }

    /// Whether every constraint of `other` already holds for `self`
    pub fn satisfies(&self, other: &Spec) -> bool {
        let name_ok = match (&self.name, &other.name) {
            (_, None) => true,
            (Some(a), Some(b)) => a == b,
            (None, Some(_)) => false,
        };
        let compiler_ok = match (&self.compiler, &other.compiler) {
            (_, None) => true,
            (Some(mine), Some(theirs)) => {
                mine.name == theirs.name && mine.versions.within(&theirs.versions)
            }
            (None, Some(_)) => false,
        };
        name_ok
            && compiler_ok
            && self.versions.within(&other.versions)
            && other
                .variants
                .iter()
                .all(|(name, setting)| self.variants.get(name) == Some(setting))
            && other.dependencies.iter().all(|(name, dep)| {
                self.dependencies
                    .get(name)
                    .is_some_and(|mine| mine.satisfies(dep))
            })
    }

    /// Whether some configuration satisfies both expressions
    pub fn intersects(&self, other: &Spec) -> bool {
        self.clone().constrain_in_place(other).is_ok()
    }
}

impl FromStr for Spec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        for (name, setting) in &self.variants {
            if let VariantSetting::Enabled(on) = setting {
                write!(f, "{}{}", if *on { '+' } else { '~' }, name)?;
            }
        }
        for (name, setting) in &self.variants {
            if let VariantSetting::Values(values) = setting {
                write!(f, " {}={}", name, values.join(","))?;
            }
        }
        if let Some(compiler) = &self.compiler {
            write!(f, "{}", compiler)?;
        }
        for dep in self.dependencies.values() {
            write!(f, " ^{}", dep)?;
        }
        Ok(())
    }
}

impl Serialize for Spec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
