// src/variant.rs

//! Package variants
//!
//! A variant is a build option a package exposes, such as `+shared` or
//! `fabrics=psm,verbs`. Each variant has a value domain chosen explicitly by
//! the recipe author or inferred from its default:
//!
//! 1. No domain given and the default is boolean-like (`true`, `false`, or
//!    a string spelling either, any case) -> [`VariantValues::Boolean`]
//! 2. No domain given otherwise -> [`VariantValues::Any`]
//!
//! When no default is given it becomes `false` for a boolean domain and the
//! empty string for every other domain.

use crate::error::{Error, Result};
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Grammar every variant name (and package name) must match
pub static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").expect("identifier regex is valid")
});

/// Check a name against the identifier grammar
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// A default variant value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Bool(bool),
    Str(String),
}

impl VariantValue {
    /// Whether the value is `true`/`false` or a string spelling one of them
    pub fn is_boolean_like(&self) -> bool {
        match self {
            Self::Bool(_) => true,
            Self::Str(s) => matches!(s.to_ascii_uppercase().as_str(), "TRUE" | "FALSE"),
        }
    }
}

impl From<bool> for VariantValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for VariantValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for VariantValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Predicate accepting a single variant value
pub type ValuePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Validator run over the whole group of values given for a variant
pub type GroupValidator = Arc<dyn Fn(&[String]) -> std::result::Result<(), String> + Send + Sync>;

/// The set of values a variant accepts
#[derive(Clone)]
pub enum VariantValues {
    /// `true` or `false`
    Boolean,
    /// One of a fixed set of strings
    Enumerated(BTreeSet<String>),
    /// Anything the predicate accepts
    Predicate(ValuePredicate),
    /// Any value at all
    Any,
}

impl VariantValues {
    /// Build an enumerated domain
    pub fn enumerated<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enumerated(values.into_iter().map(Into::into).collect())
    }

    /// Build a predicate domain
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Infer the domain for a variant declared without one
    pub fn infer(default: Option<&VariantValue>) -> Self {
        match default {
            Some(d) if d.is_boolean_like() => Self::Boolean,
            _ => Self::Any,
        }
    }

    /// The default used when a variant is declared without one
    pub fn implied_default(&self) -> VariantValue {
        match self {
            Self::Boolean => VariantValue::Bool(false),
            _ => VariantValue::Str(String::new()),
        }
    }

    fn accepts(&self, value: &str, default: &VariantValue) -> bool {
        match self {
            Self::Boolean => matches!(value.to_ascii_lowercase().as_str(), "true" | "false"),
            Self::Enumerated(allowed) => allowed.contains(value) || default.to_string() == value,
            Self::Predicate(f) => f(value),
            Self::Any => true,
        }
    }
}

impl PartialEq for VariantValues {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean, Self::Boolean) | (Self::Any, Self::Any) => true,
            (Self::Enumerated(a), Self::Enumerated(b)) => a == b,
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for VariantValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("Boolean"),
            Self::Enumerated(values) => f.debug_tuple("Enumerated").field(values).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Any => f.write_str("Any"),
        }
    }
}

/// A variant definition stored in a package descriptor
#[derive(Clone)]
pub struct Variant {
    pub name: String,
    pub default: VariantValue,
    pub description: String,
    pub values: VariantValues,
    pub multi: bool,
    pub validator: Option<GroupValidator>,
}

impl Variant {
    /// Human-readable list of allowed values
    pub fn allowed_values(&self) -> String {
        match &self.values {
            VariantValues::Boolean => "True, False".to_string(),
            VariantValues::Enumerated(values) => {
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            }
            VariantValues::Predicate(_) => "<checked by predicate>".to_string(),
            VariantValues::Any => "<any value>".to_string(),
        }
    }

    /// Check a group of values requested for this variant
    ///
    /// Single-valued variants take exactly one value; every value must be in
    /// the domain (the default always is); finally the group validator runs.
    pub fn validate(&self, values: &[String]) -> Result<()> {
        if !self.multi && values.len() != 1 {
            return Err(Error::MultipleValuesInExclusiveVariant {
                variant: self.name.clone(),
                count: values.len(),
            });
        }

        let invalid: Vec<String> = values
            .iter()
            .filter(|v| !self.values.accepts(v, &self.default))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(Error::InvalidVariantValue {
                variant: self.name.clone(),
                values: invalid,
                allowed: self.allowed_values(),
            });
        }

        if let Some(validator) = &self.validator {
            validator(values).map_err(|reason| Error::InvalidVariantValue {
                variant: self.name.clone(),
                values: values.to_vec(),
                allowed: reason,
            })?;
        }

        Ok(())
    }

    pub fn is_boolean(&self) -> bool {
        !self.multi && self.values == VariantValues::Boolean
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        let validators_eq = match (&self.validator, &other.validator) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.name == other.name
            && self.default == other.default
            && self.description == other.description
            && self.values == other.values
            && self.multi == other.multi
            && validators_eq
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("description", &self.description)
            .field("values", &self.values)
            .field("multi", &self.multi)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Serialize for Variant {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Variant", 5)?;
        s.serialize_field("default", &self.default)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("values", &self.allowed_values())?;
        s.serialize_field("multi", &self.multi)?;
        s.serialize_field("validator", &self.validator.is_some())?;
        s.end()
    }
}
