// src/directive/custom.rs

//! Custom directives
//!
//! A directive registered at runtime replays through a [`DescriptorMut`]
//! handle instead of the raw descriptor. The handle only lets the action
//! change the descriptor fields its definition declared; touching any other
//! field fails with [`Error::InvalidDirectiveConfig`].

use super::{
    Condition, ConflictsDirective, DependsOnDirective, Directive, FieldSet, ProvidesDirective,
    VersionDirective,
};
use crate::config::EngineConfig;
use crate::deptype::DepTypes;
use crate::descriptor::{PackageDescriptor, VersionMeta};
use crate::error::{Error, Result};
use crate::spec::{Spec, Version};
use std::fmt;
use std::sync::Arc;

/// Replay function of a registered custom directive
pub type CustomAction = Arc<dyn Fn(&mut DescriptorMut<'_>) -> Result<()> + Send + Sync>;

/// A directive created through [`DirectiveRegistry::register`](super::DirectiveRegistry::register)
#[derive(Clone)]
pub struct CustomDirective {
    pub(crate) name: Arc<str>,
    pub(crate) fields: FieldSet,
    pub(crate) action: CustomAction,
}

impl CustomDirective {
    pub(crate) fn apply(
        &self,
        descriptor: &mut PackageDescriptor,
        config: &EngineConfig,
    ) -> Result<()> {
        let mut handle = DescriptorMut {
            descriptor,
            directive: &self.name,
            fields: &self.fields,
            config,
        };
        (self.action)(&mut handle)
    }
}

impl PartialEq for CustomDirective {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.action, &other.action)
    }
}

impl fmt::Debug for CustomDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDirective")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Mutable access to a descriptor, limited to a directive's declared fields
pub struct DescriptorMut<'a> {
    descriptor: &'a mut PackageDescriptor,
    directive: &'a str,
    fields: &'a FieldSet,
    config: &'a EngineConfig,
}

impl DescriptorMut<'_> {
    /// Name of the package under construction
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Read-only view of everything recorded so far
    pub fn descriptor(&self) -> &PackageDescriptor {
        &*self.descriptor
    }

    /// Fields this handle may change
    pub fn fields(&self) -> &FieldSet {
        self.fields
    }

    /// Replay `directive` through this handle
    ///
    /// Every field the directive affects must be declared by the custom
    /// directive doing the replay.
    pub fn apply(&mut self, directive: &Directive) -> Result<()> {
        let affected = directive.affected_fields();
        if let Some(field) = affected.iter().find(|f| !self.fields.contains(*f)) {
            return Err(Error::InvalidDirectiveConfig(format!(
                "directive '{}' does not declare field '{}' (needed by '{}')",
                self.directive,
                field,
                directive.name()
            )));
        }
        directive.apply(self.descriptor, self.config)
    }

    /// Record version `id` with `meta`; last write wins
    pub fn version(&mut self, id: &str, meta: VersionMeta) -> Result<()> {
        self.apply(&Directive::Version(VersionDirective {
            id: Version::parse(id)?,
            checksum: None,
            metadata: meta,
        }))
    }

    /// Depend on `target` under `when`, merging with an existing requirement
    pub fn depends_on(
        &mut self,
        target: &str,
        when: impl Into<Condition>,
        types: DepTypes,
    ) -> Result<()> {
        let when = when.into();
        if when.is_never() {
            return Ok(());
        }
        self.apply(&Directive::DependsOn(DependsOnDirective {
            target: Spec::parse(target)?,
            when: when.parse()?,
            types,
            patches: Vec::new(),
        }))
    }

    /// Record a conflict with `expr` under `when`
    pub fn conflicts(
        &mut self,
        expr: &str,
        when: impl Into<Condition>,
        msg: Option<&str>,
    ) -> Result<()> {
        let when = when.into();
        if when.is_never() {
            return Ok(());
        }
        self.apply(&Directive::Conflicts(ConflictsDirective {
            conflict: Spec::parse(expr)?,
            when: when.parse()?,
            msg: msg.map(str::to_string),
        }))
    }

    /// Provide the virtual package `expr` under `when`
    pub fn provides(&mut self, expr: &str, when: impl Into<Condition>) -> Result<()> {
        let when = when.into();
        if when.is_never() {
            return Ok(());
        }
        self.apply(&Directive::Provides(ProvidesDirective {
            virtuals: vec![Spec::parse(expr)?],
            when: when.parse()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorField;
    use crate::directive::ExtendsDirective;

    fn replay(
        fields: &[DescriptorField],
        action: impl Fn(&mut DescriptorMut<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> Result<PackageDescriptor> {
        let custom = CustomDirective {
            name: Arc::from("custom"),
            fields: FieldSet::of(fields),
            action: Arc::new(action),
        };
        let mut descriptor = PackageDescriptor::new("app");
        custom.apply(&mut descriptor, &EngineConfig::default())?;
        Ok(descriptor)
    }

    #[test]
    fn test_declared_field_is_writable() {
        let desc = replay(&[DescriptorField::Dependencies], |d| {
            d.depends_on("zlib@1.2:", Condition::Always, DepTypes::default_set())
        })
        .unwrap();
        assert!(desc.dependency("zlib", &Spec::named("app")).is_some());
    }

    #[test]
    fn test_undeclared_field_is_rejected() {
        let err = replay(&[DescriptorField::Conflicts], |d| {
            d.version("1.0", VersionMeta::new())
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDirectiveConfig(ref m) if m.contains("versions")));
    }

    #[test]
    fn test_extends_needs_both_fields() {
        let err = replay(&[DescriptorField::Extendees], |d| {
            d.apply(&Directive::Extends(ExtendsDirective {
                target: Spec::parse("python")?,
                when: None,
                types: DepTypes::default_set(),
                options: Default::default(),
            }))
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDirectiveConfig(_)));
    }

    #[test]
    fn test_never_condition_is_skipped() {
        let desc = replay(&[DescriptorField::Provided], |d| d.provides("mpi", false)).unwrap();
        assert!(desc.provided().is_empty());
    }
}
