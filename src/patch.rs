// src/patch.rs

//! Patch records
//!
//! A patch is either a file shipped next to the recipe or a URL. URL patches
//! carry the checksum of the patch itself and, when the URL points at a
//! compressed archive, the checksum of the archive as well.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Archive extensions that require an `archive_sha256`
const ARCHIVE_EXTENSIONS: &[&str] = &[".gz", ".bz2", ".xz", ".tgz", ".tar", ".zip"];

/// Optional metadata accepted by the `patch` directive
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchMeta {
    /// Checksum of the (expanded) patch file
    #[serde(default)]
    pub sha256: Option<String>,
    /// Checksum of the downloaded archive, for compressed URL patches
    #[serde(default)]
    pub archive_sha256: Option<String>,
    /// Directory to change into before applying, relative to the source root
    #[serde(default)]
    pub workdir: Option<String>,
}

/// Where a patch comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PatchSource {
    /// A file relative to the recipe directory
    File { path: PathBuf },
    /// A remote patch
    Url {
        url: String,
        sha256: Option<String>,
        archive_sha256: Option<String>,
    },
}

/// A patch to apply to some package's expanded source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Patch {
    /// Package whose source gets patched
    pub owner: String,
    pub source: PatchSource,
    /// Strip level, as in `patch -p<level>`
    pub level: u32,
    pub workdir: String,
}

impl Patch {
    /// Create the right kind of patch for `locator`
    ///
    /// Locators containing `://` are URL patches; anything else is a file
    /// relative to `recipe_dir` (or to the recipe itself when no directory
    /// is known).
    pub fn create(
        owner: &str,
        locator: &str,
        level: u32,
        meta: &PatchMeta,
        recipe_dir: Option<&Path>,
    ) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPatch {
            locator: locator.to_string(),
            reason: reason.to_string(),
        };

        let source = if locator.contains("://") {
            let url = Url::parse(locator).map_err(|e| invalid(&e.to_string()))?;
            let path = url.path().to_ascii_lowercase();
            let compressed = ARCHIVE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
            if compressed && meta.archive_sha256.is_none() {
                return Err(invalid("compressed patches require 'archive_sha256'"));
            }
            PatchSource::Url {
                url: url.to_string(),
                sha256: meta.sha256.clone(),
                archive_sha256: meta.archive_sha256.clone(),
            }
        } else {
            if locator.trim().is_empty() {
                return Err(invalid("empty patch locator"));
            }
            let relative = Path::new(locator);
            if relative.is_absolute() {
                return Err(invalid("patch files must be relative to the recipe"));
            }
            if meta.archive_sha256.is_some() {
                return Err(invalid("'archive_sha256' only applies to URL patches"));
            }
            let path = match recipe_dir {
                Some(dir) => dir.join(relative),
                None => relative.to_path_buf(),
            };
            PatchSource::File { path }
        };

        Ok(Self {
            owner: owner.to_string(),
            source,
            level,
            workdir: meta.workdir.clone().unwrap_or_else(|| ".".to_string()),
        })
    }

    /// The locator as written (path or URL)
    pub fn locator(&self) -> String {
        match &self.source {
            PatchSource::File { path } => path.display().to_string(),
            PatchSource::Url { url, .. } => url.clone(),
        }
    }
}
