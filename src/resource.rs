// src/resource.rs

//! Extra resources staged alongside a package's own source

use crate::error::{Error, Result};
use crate::fetch::FetchStrategy;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Where a resource is placed relative to the package stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    pub name: Option<String>,
    pub fetcher: FetchStrategy,
    /// Directory under the package stage, empty for the stage root
    pub destination: String,
    /// Optional rename of the expanded resource inside `destination`
    pub placement: Option<String>,
}

/// Check that `destination` stays inside the package stage
///
/// The destination is joined to `stage_root` and normalized lexically; the
/// result must remain nested under `stage_root`.
pub fn validate_destination(destination: &str, stage_root: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidDestination {
        destination: destination.to_string(),
        reason: reason.to_string(),
    };

    if Path::new(destination).is_absolute() {
        return Err(invalid("must be a relative path"));
    }

    let root = Path::new(stage_root);
    let mut normalized = PathBuf::from(stage_root);
    for component in Path::new(destination).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(invalid("escapes the package stage"));
                }
            }
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be a relative path"));
            }
        }
    }

    if !normalized.starts_with(root) {
        return Err(invalid("escapes the package stage"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "stage_folder_root";

    #[test]
    fn test_nested_destinations_ok() {
        assert!(validate_destination("", ROOT).is_ok());
        assert!(validate_destination("sub/dir", ROOT).is_ok());
        assert!(validate_destination("./sub/../other", ROOT).is_ok());
    }

    #[test]
    fn test_escaping_destinations_rejected() {
        assert!(matches!(
            validate_destination("../escape", ROOT),
            Err(Error::InvalidDestination { .. })
        ));
        assert!(validate_destination("sub/../../escape", ROOT).is_err());
        assert!(validate_destination("/usr/share", ROOT).is_err());
    }
}
