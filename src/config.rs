// src/config.rs

//! Engine configuration
//!
//! Settings that shape how directives are validated and replayed. Loaded
//! from TOML; every key is optional.
//!
//! ```toml
//! [directives]
//! reserved_variant_names = ["patches"]
//! stage_root = "stage_folder_root"
//! extends_policy = "reject"
//! default_deptypes = ["build", "link"]
//! ```

use crate::deptype::{DEFAULT_DEPTYPES, DepTypeSpec, DepTypes, canonical_deptype};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Configuration file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pkgmeta.toml";

/// What to do when a package extends a second, different package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtendsPolicy {
    /// Fail construction with `MultipleExtendees`
    #[default]
    Reject,
    /// Keep the first extendee and record later ones as plain dependencies
    Ignore,
}

/// Settings for directive validation and replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectiveSettings {
    /// Variant names packages may not declare
    pub reserved_variant_names: Vec<String>,
    /// Sentinel root used to check that resource destinations stay nested
    pub stage_root: String,
    pub extends_policy: ExtendsPolicy,
    /// Dependency types used when `depends_on` names none
    pub default_deptypes: Vec<String>,
}

impl Default for DirectiveSettings {
    fn default() -> Self {
        Self {
            reserved_variant_names: vec!["patches".to_string()],
            stage_root: "stage_folder_root".to_string(),
            extends_policy: ExtendsPolicy::default(),
            default_deptypes: DEFAULT_DEPTYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub directives: DirectiveSettings,
}

static DEFAULT_CONFIG: LazyLock<Arc<EngineConfig>> =
    LazyLock::new(|| Arc::new(EngineConfig::default()));

impl EngineConfig {
    /// Shared default configuration
    pub fn shared_default() -> Arc<EngineConfig> {
        Arc::clone(&DEFAULT_CONFIG)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Check settings that cannot be expressed in the TOML schema
    pub fn validate(&self) -> Result<()> {
        let settings = &self.directives;
        if settings.stage_root.trim().is_empty() {
            return Err(Error::Config("stage_root cannot be empty".to_string()));
        }
        if Path::new(&settings.stage_root).is_absolute() {
            return Err(Error::Config("stage_root must be a relative sentinel".to_string()));
        }
        let types = self.default_deptypes()?;
        if types.is_empty() {
            return Err(Error::Config("default_deptypes cannot be empty".to_string()));
        }
        Ok(())
    }

    /// The canonical default dependency types
    pub fn default_deptypes(&self) -> Result<DepTypes> {
        let spec = DepTypeSpec::Many(self.directives.default_deptypes.clone());
        canonical_deptype(Some(&spec)).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn is_reserved_variant(&self, name: &str) -> bool {
        self.directives
            .reserved_variant_names
            .iter()
            .any(|reserved| reserved == name)
    }
}
