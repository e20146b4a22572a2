// src/error.rs

//! Error types for descriptor construction
//!
//! Every failure is fatal to the package currently under construction.
//! Errors raised while replaying a directive are wrapped in
//! [`Error::Directive`] so the message names both the package and the
//! directive that failed.

use thiserror::Error;

/// Errors raised while declaring, merging or replaying directives
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid dependency type: {0}")]
    InvalidDependencyType(String),

    #[error("Circular reference: {0}")]
    CircularReference(String),

    #[error("Invalid variant name: {0}")]
    InvalidVariantName(String),

    #[error("Invalid value(s) {values:?} for variant '{variant}' (allowed: {allowed})")]
    InvalidVariantValue {
        variant: String,
        values: Vec<String>,
        allowed: String,
    },

    #[error("Variant '{variant}' accepts a single value, got {count}")]
    MultipleValuesInExclusiveVariant { variant: String, count: usize },

    #[error("Invalid resource destination '{destination}': {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("Incompatible constraint: {0}")]
    IncompatibleConstraint(String),

    #[error("Invalid directive configuration: {0}")]
    InvalidDirectiveConfig(String),

    #[error("Invalid constraint expression '{expr}': {reason}")]
    SpecParse { expr: String, reason: String },

    #[error("Invalid version '{0}'")]
    VersionParse(String),

    #[error("Invalid patch '{locator}': {reason}")]
    InvalidPatch { locator: String, reason: String },

    #[error("No fetch strategy could be selected from: {0}")]
    NoFetchStrategy(String),

    #[error("Conflicting fetch strategies: {0}")]
    ConflictingFetchStrategy(String),

    #[error("Package '{package}' already extends '{existing}', cannot also extend '{requested}'")]
    MultipleExtendees {
        package: String,
        existing: String,
        requested: String,
    },

    #[error("Error in directive '{directive}' of package '{package}': {source}")]
    Directive {
        package: String,
        directive: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to parse recipe: {0}")]
    RecipeParse(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("Circular inheritance detected: {0}")]
    CircularInheritance(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap this error with the package and directive that raised it
    pub fn in_directive(self, package: &str, directive: &str) -> Self {
        match self {
            // Already attributed, keep the innermost location
            err @ Error::Directive { .. } => err,
            other => Error::Directive {
                package: package.to_string(),
                directive: directive.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, looking through directive attribution
    pub fn root(&self) -> &Error {
        match self {
            Error::Directive { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for descriptor operations
pub type Result<T> = std::result::Result<T, Error>;
