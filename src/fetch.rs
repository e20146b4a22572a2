// src/fetch.rs

//! Fetch strategy selection
//!
//! Resources (and versions) describe where their source lives with a bag of
//! recognized keys. Exactly one source key (`url`, `git`, `hg`, `svn`) picks
//! the strategy; the remaining keys refine it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Recognized fetch arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchArgs {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub hg: Option<String>,
    #[serde(default)]
    pub svn: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    /// Whether to expand a downloaded archive (default true)
    #[serde(default)]
    pub expand: Option<bool>,
}

/// Which git reference to check out
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GitRef {
    Default,
    Tag(String),
    Branch(String),
    Commit(String),
}

/// Checksum of a downloaded archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Checksum {
    Sha256(String),
    Md5(String),
}

/// How to obtain a source tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FetchStrategy {
    Url {
        url: String,
        checksum: Option<Checksum>,
        expand: bool,
    },
    Git {
        repository: String,
        reference: GitRef,
    },
    Hg {
        repository: String,
        revision: Option<String>,
    },
    Svn {
        repository: String,
        revision: Option<String>,
    },
}

fn validate_location(location: &str) -> Result<String> {
    Url::parse(location)
        .map(|u| u.to_string())
        .map_err(|e| Error::NoFetchStrategy(format!("invalid location '{}': {}", location, e)))
}

impl FetchStrategy {
    /// Select a fetch strategy from the recognized arguments
    pub fn from_args(args: &FetchArgs) -> Result<Self> {
        let sources: Vec<(&str, &String)> = [
            ("url", &args.url),
            ("git", &args.git),
            ("hg", &args.hg),
            ("svn", &args.svn),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
        .collect();

        let (key, location) = match sources.as_slice() {
            [] => {
                return Err(Error::NoFetchStrategy(
                    "expected one of 'url', 'git', 'hg', 'svn'".to_string(),
                ));
            }
            [one] => *one,
            many => {
                let keys: Vec<&str> = many.iter().map(|(k, _)| *k).collect();
                return Err(Error::ConflictingFetchStrategy(keys.join(", ")));
            }
        };

        match key {
            "url" => {
                let checksum = match (&args.sha256, &args.md5) {
                    (Some(_), Some(_)) => {
                        return Err(Error::ConflictingFetchStrategy(
                            "both 'sha256' and 'md5' given".to_string(),
                        ));
                    }
                    (Some(s), None) => Some(Checksum::Sha256(s.clone())),
                    (None, Some(m)) => Some(Checksum::Md5(m.clone())),
                    (None, None) => None,
                };
                Ok(Self::Url {
                    url: validate_location(location)?,
                    checksum,
                    expand: args.expand.unwrap_or(true),
                })
            }
            "git" => {
                let refs: Vec<GitRef> = [
                    args.tag.clone().map(GitRef::Tag),
                    args.branch.clone().map(GitRef::Branch),
                    args.commit.clone().map(GitRef::Commit),
                ]
                .into_iter()
                .flatten()
                .collect();
                if refs.len() > 1 {
                    return Err(Error::ConflictingFetchStrategy(
                        "git accepts only one of 'tag', 'branch', 'commit'".to_string(),
                    ));
                }
                Ok(Self::Git {
                    repository: validate_location(location)?,
                    reference: refs.into_iter().next().unwrap_or(GitRef::Default),
                })
            }
            "hg" => Ok(Self::Hg {
                repository: validate_location(location)?,
                revision: args.revision.clone(),
            }),
            _ => Ok(Self::Svn {
                repository: validate_location(location)?,
                revision: args.revision.clone(),
            }),
        }
    }
}
