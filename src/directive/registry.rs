// src/directive/registry.rs

//! Directive registry
//!
//! Every directive declares which descriptor fields it affects. The built-in
//! directives form a closed table; additional directives can be registered
//! at runtime as long as they only touch known descriptor fields.

use super::{CustomAction, CustomDirective, DescriptorMut, Directive};
use crate::descriptor::DescriptorField;
use crate::error::{Error, Result};
use crate::variant::is_valid_identifier;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

/// A built-in directive and the fields it affects
#[derive(Debug, Clone, Copy)]
pub struct DirectiveInfo {
    pub name: &'static str,
    pub fields: &'static [DescriptorField],
}

/// The built-in directive table
pub static BUILTIN_DIRECTIVES: &[DirectiveInfo] = &[
    DirectiveInfo {
        name: "version",
        fields: &[DescriptorField::Versions],
    },
    DirectiveInfo {
        name: "depends_on",
        fields: &[DescriptorField::Dependencies],
    },
    DirectiveInfo {
        name: "extends",
        fields: &[DescriptorField::Extendees, DescriptorField::Dependencies],
    },
    DirectiveInfo {
        name: "conflicts",
        fields: &[DescriptorField::Conflicts],
    },
    DirectiveInfo {
        name: "provides",
        fields: &[DescriptorField::Provided],
    },
    DirectiveInfo {
        name: "patch",
        fields: &[DescriptorField::Patches],
    },
    DirectiveInfo {
        name: "variant",
        fields: &[DescriptorField::Variants],
    },
    DirectiveInfo {
        name: "resource",
        fields: &[DescriptorField::Resources],
    },
];

/// Affected-field names as given by a caller: one name or an ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldsArg {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for FieldsArg {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<&[&str]> for FieldsArg {
    fn from(items: &[&str]) -> Self {
        Self::Many(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldsArg {
    fn from(items: [&str; N]) -> Self {
        Self::Many(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for FieldsArg {
    fn from(items: Vec<String>) -> Self {
        Self::Many(items)
    }
}

/// A validated, non-empty set of descriptor fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSet(BTreeSet<DescriptorField>);

impl FieldSet {
    /// Build a field set from known fields
    pub fn of(fields: &[DescriptorField]) -> Self {
        Self(fields.iter().copied().collect())
    }

    /// Validate caller-supplied field names
    pub fn parse(arg: &FieldsArg) -> Result<Self> {
        let names: Vec<&str> = match arg {
            FieldsArg::One(name) => vec![name.as_str()],
            FieldsArg::Many(names) => names.iter().map(String::as_str).collect(),
        };
        if names.is_empty() {
            return Err(Error::InvalidDirectiveConfig(
                "a directive must affect at least one descriptor field".to_string(),
            ));
        }
        names
            .into_iter()
            .map(|name| {
                DescriptorField::from_str(name).map_err(|_| {
                    Error::InvalidDirectiveConfig(format!("unknown descriptor field '{}'", name))
                })
            })
            .collect::<Result<BTreeSet<_>>>()
            .map(Self)
    }

    pub fn contains(&self, field: DescriptorField) -> bool {
        self.0.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = DescriptorField> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A registered directive that can produce actions
#[derive(Debug, Clone)]
pub struct DirectiveDef {
    name: Arc<str>,
    fields: FieldSet,
}

impl DirectiveDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Wrap `action` as a directive to be replayed later
    ///
    /// On replay the action receives a [`DescriptorMut`] that can only change
    /// the fields this definition was registered with.
    pub fn action(
        &self,
        action: impl Fn(&mut DescriptorMut<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> Directive {
        let action: CustomAction = Arc::new(action);
        Directive::Custom(CustomDirective {
            name: Arc::clone(&self.name),
            fields: self.fields.clone(),
            action,
        })
    }
}

/// Known directives and the descriptor fields they affect
#[derive(Debug, Clone)]
pub struct DirectiveRegistry {
    directives: BTreeMap<String, FieldSet>,
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DirectiveRegistry {
    /// A registry holding the built-in directives
    pub fn builtin() -> Self {
        let directives = BUILTIN_DIRECTIVES
            .iter()
            .map(|info| (info.name.to_string(), FieldSet::of(info.fields)))
            .collect();
        Self { directives }
    }

    /// Register a new directive affecting `fields`
    pub fn register(&mut self, name: &str, fields: impl Into<FieldsArg>) -> Result<DirectiveDef> {
        if !is_valid_identifier(name) {
            return Err(Error::InvalidDirectiveConfig(format!(
                "invalid directive name '{}'",
                name
            )));
        }
        if self.directives.contains_key(name) {
            return Err(Error::InvalidDirectiveConfig(format!(
                "directive '{}' is already registered",
                name
            )));
        }
        let fields = FieldSet::parse(&fields.into())?;
        self.directives.insert(name.to_string(), fields.clone());
        Ok(DirectiveDef {
            name: Arc::from(name),
            fields,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn fields_of(&self, name: &str) -> Option<&FieldSet> {
        self.directives.get(name)
    }

    /// Every descriptor field some registered directive affects
    pub fn known_fields(&self) -> BTreeSet<DescriptorField> {
        self.directives.values().flat_map(|f| f.iter()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directives.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_builtin_registry_covers_every_field() {
        let registry = DirectiveRegistry::builtin();
        let known = registry.known_fields();
        for field in DescriptorField::iter() {
            assert!(known.contains(&field), "{} not covered", field);
        }
        assert_eq!(
            registry.fields_of("extends").unwrap(),
            &FieldSet::of(&[DescriptorField::Dependencies, DescriptorField::Extendees])
        );
    }

    #[test]
    fn test_register_single_and_list() {
        let mut registry = DirectiveRegistry::builtin();
        let def = registry.register("maintainers_note", "conflicts").unwrap();
        assert!(def.fields().contains(DescriptorField::Conflicts));
        let def = registry
            .register("pinned_deps", ["dependencies", "versions"])
            .unwrap();
        assert_eq!(def.fields().len(), 2);
        assert!(registry.contains("pinned_deps"));
    }

    #[test]
    fn test_register_rejects_bad_config() {
        let mut registry = DirectiveRegistry::builtin();
        assert!(matches!(
            registry.register("x", "colours"),
            Err(Error::InvalidDirectiveConfig(_))
        ));
        assert!(matches!(
            registry.register("y", Vec::<String>::new()),
            Err(Error::InvalidDirectiveConfig(_))
        ));
        assert!(matches!(
            registry.register("version", "versions"),
            Err(Error::InvalidDirectiveConfig(_))
        ));
        assert!(matches!(
            registry.register("bad name", "versions"),
            Err(Error::InvalidDirectiveConfig(_))
        ));
    }
}
