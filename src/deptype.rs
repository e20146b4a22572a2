// src/deptype.rs

//! Dependency types and their canonical form
//!
//! A dependency edge is needed at build time, at link time, at run time, or
//! any combination of these. The canonical form of a set of dependency types
//! is sorted and free of duplicates.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The purpose of a dependency edge
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DependencyType {
    /// Needed to build the dependent package
    Build,
    /// Linked into the dependent package
    Link,
    /// Needed when the dependent package runs
    Run,
}

/// Dependency types used when a directive does not name any
pub const DEFAULT_DEPTYPES: [DependencyType; 2] = [DependencyType::Build, DependencyType::Link];

/// Requested dependency types, as written by a recipe author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepTypeSpec {
    /// Every known dependency type
    #[serde(skip)]
    All,
    /// A single type name
    One(String),
    /// A list of type names
    Many(Vec<String>),
}

impl From<&str> for DepTypeSpec {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<String> for DepTypeSpec {
    fn from(s: String) -> Self {
        Self::One(s)
    }
}

impl From<&[&str]> for DepTypeSpec {
    fn from(items: &[&str]) -> Self {
        Self::Many(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DepTypeSpec {
    fn from(items: [&str; N]) -> Self {
        Self::Many(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for DepTypeSpec {
    fn from(items: Vec<String>) -> Self {
        Self::Many(items)
    }
}

impl From<DependencyType> for DepTypeSpec {
    fn from(ty: DependencyType) -> Self {
        Self::One(ty.to_string())
    }
}

/// A canonical set of dependency types
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepTypes(BTreeSet<DependencyType>);

impl DepTypes {
    /// Every known dependency type
    pub fn all() -> Self {
        Self(DependencyType::iter().collect())
    }

    /// The default `{build, link}` set
    pub fn default_set() -> Self {
        Self(DEFAULT_DEPTYPES.into_iter().collect())
    }

    pub fn contains(&self, ty: DependencyType) -> bool {
        self.0.contains(&ty)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Types in canonical (sorted) order
    pub fn iter(&self) -> impl Iterator<Item = DependencyType> + '_ {
        self.0.iter().copied()
    }

    /// The canonical tuple as a vector
    pub fn to_vec(&self) -> Vec<DependencyType> {
        self.iter().collect()
    }

    /// Add every type of `other` to this set
    pub fn union_with(&mut self, other: &DepTypes) {
        self.0.extend(other.0.iter().copied());
    }
}

impl FromIterator<DependencyType> for DepTypes {
    fn from_iter<I: IntoIterator<Item = DependencyType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for DepTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|t| t.as_ref()).collect();
        write!(f, "({})", names.join(", "))
    }
}

fn parse_one(name: &str) -> Result<DependencyType> {
    DependencyType::from_str(name).map_err(|_| Error::InvalidDependencyType(name.to_string()))
}

/// Convert requested dependency types to their canonical form
///
/// `None`, the literal `"all"` and [`DepTypeSpec::All`] mean every type.
/// A single name or a list of names is validated against the known types;
/// the first unknown entry is reported.
pub fn canonical_deptype(spec: Option<&DepTypeSpec>) -> Result<DepTypes> {
    match spec {
        None | Some(DepTypeSpec::All) => Ok(DepTypes::all()),
        Some(DepTypeSpec::One(name)) if name == "all" => Ok(DepTypes::all()),
        Some(DepTypeSpec::One(name)) => Ok(DepTypes(BTreeSet::from([parse_one(name)?]))),
        Some(DepTypeSpec::Many(names)) => names.iter().map(|n| parse_one(n)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DependencyType::*;

    #[test]
    fn test_canonical_sorts_and_dedupes() {
        let spec = DepTypeSpec::from(["run", "build", "build"]);
        let types = canonical_deptype(Some(&spec)).unwrap();
        assert_eq!(types.to_vec(), vec![Build, Run]);
    }

    #[test]
    fn test_canonical_all_forms() {
        let full = vec![Build, Link, Run];
        assert_eq!(canonical_deptype(None).unwrap().to_vec(), full);
        assert_eq!(
            canonical_deptype(Some(&DepTypeSpec::from("all"))).unwrap().to_vec(),
            full
        );
        assert_eq!(
            canonical_deptype(Some(&DepTypeSpec::All)).unwrap().to_vec(),
            full
        );
    }

    #[test]
    fn test_canonical_single() {
        let types = canonical_deptype(Some(&DepTypeSpec::from("link"))).unwrap();
        assert_eq!(types.to_vec(), vec![Link]);
    }

    #[test]
    fn test_canonical_rejects_unknown() {
        let err = canonical_deptype(Some(&DepTypeSpec::from("bogus"))).unwrap_err();
        assert!(matches!(err, Error::InvalidDependencyType(ref t) if t == "bogus"));
    }

    #[test]
    fn test_canonical_reports_first_invalid_entry() {
        let spec = DepTypeSpec::from(["build", "test", "install"]);
        let err = canonical_deptype(Some(&spec)).unwrap_err();
        assert!(matches!(err, Error::InvalidDependencyType(ref t) if t == "test"));
    }

    #[test]
    fn test_union_and_display() {
        let mut types = DepTypes::from_iter([Build]);
        types.union_with(&DepTypes::from_iter([Link, Build]));
        assert_eq!(types, DepTypes::default_set());
        assert_eq!(types.to_string(), "(build, link)");
    }

    #[test]
    fn test_deserialize_string_or_list() {
        #[derive(Deserialize)]
        struct Holder {
            r#type: DepTypeSpec,
        }
        let one: Holder = toml::from_str(r#"type = "run""#).unwrap();
        assert_eq!(one.r#type, DepTypeSpec::One("run".to_string()));
        let many: Holder = toml::from_str(r#"type = ["build", "run"]"#).unwrap();
        assert_eq!(
            many.r#type,
            DepTypeSpec::Many(vec!["build".to_string(), "run".to_string()])
        );
    }
}
