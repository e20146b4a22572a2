// src/spec/version.rs

//! Version identifiers, ranges and range lists
//!
//! Versions are split into segments at `.`, `-` and `_` and at every change
//! between digits and letters, so `1.2rc3` has the segments `1 2 rc 3`.
//! Numeric segments compare numerically and sort after alphabetic ones.
//!
//! A range's upper bound admits every version it is a prefix of: `:1.2`
//! contains `1.2.7`, and the exact constraint `@1.2` is the range `1.2:1.2`.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Num(u64),
    Alpha(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
            (Segment::Alpha(a), Segment::Alpha(b)) => a.cmp(b),
            (Segment::Alpha(_), Segment::Num(_)) => Ordering::Less,
            (Segment::Num(_), Segment::Alpha(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A package version such as `1.2.11` or `20111030`
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::VersionParse(s.to_string()));
        }

        let mut segments = Vec::new();
        let mut current = String::new();

        let flush = |current: &mut String, segments: &mut Vec<Segment>| -> Result<()> {
            if current.is_empty() {
                return Ok(());
            }
            let seg = if current.chars().all(|c| c.is_ascii_digit()) {
                let n = current
                    .parse::<u64>()
                    .map_err(|_| Error::VersionParse(raw.to_string()))?;
                Segment::Num(n)
            } else {
                Segment::Alpha(current.clone())
            };
            segments.push(seg);
            current.clear();
            Ok(())
        };

        for c in raw.chars() {
            match c {
                '.' | '-' | '_' => flush(&mut current, &mut segments)?,
                c if c.is_ascii_alphanumeric() => {
                    let switches = current
                        .chars()
                        .last()
                        .is_some_and(|last| last.is_ascii_digit() != c.is_ascii_digit());
                    if switches {
                        flush(&mut current, &mut segments)?;
                    }
                    current.push(c);
                }
                _ => return Err(Error::VersionParse(raw.to_string())),
            }
        }
        flush(&mut current, &mut segments)?;

        if segments.is_empty() {
            return Err(Error::VersionParse(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The version as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether every segment of `self` starts `other` (`1.2` is a prefix of `1.2.4`)
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Of two upper bounds, the one admitting fewer versions
fn tighter_end<'a>(a: &'a Version, b: &'a Version) -> &'a Version {
    if a.is_prefix_of(b) {
        b
    } else if b.is_prefix_of(a) {
        a
    } else {
        a.min(b)
    }
}

/// A closed version range; a missing bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionRange {
    pub start: Option<Version>,
    pub end: Option<Version>,
}

impl VersionRange {
    /// The range admitting every version
    pub fn any() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// The range `v:v`
    pub fn exact(v: Version) -> Self {
        Self {
            start: Some(v.clone()),
            end: Some(v),
        }
    }

    pub fn is_any(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn below_end(&self, v: &Version) -> bool {
        self.end.as_ref().is_none_or(|e| v <= e || e.is_prefix_of(v))
    }

    /// Whether `v` lies within the range
    pub fn contains(&self, v: &Version) -> bool {
        self.start.as_ref().is_none_or(|s| v >= s) && self.below_end(v)
    }

    fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Some(s), Some(_)) => !self.below_end(s),
            _ => false,
        }
    }

    /// The overlap of two ranges, if any
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let start = match (&self.start, &other.start) {
            (Some(a), Some(b)) => Some(a.max(b).clone()),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        let end = match (&self.end, &other.end) {
            (Some(a), Some(b)) => Some(tighter_end(a, b).clone()),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        let range = VersionRange { start, end };
        (!range.is_empty()).then_some(range)
    }

    /// Whether every version in `self` is also in `outer`
    pub fn within(&self, outer: &VersionRange) -> bool {
        let start_ok = match (&outer.start, &self.start) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(o), Some(s)) => s >= o,
        };
        let end_ok = match (&outer.end, &self.end) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(o), Some(e)) => tighter_end(o, e) == e,
        };
        start_ok && end_ok
    }

    fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None => Ok(Self::exact(Version::parse(s)?)),
            Some((lo, hi)) => {
                let bound = |b: &str| -> Result<Option<Version>> {
                    if b.trim().is_empty() {
                        Ok(None)
                    } else {
                        Version::parse(b).map(Some)
                    }
                };
                let range = Self {
                    start: bound(lo)?,
                    end: bound(hi)?,
                };
                if range.is_empty() {
                    return Err(Error::VersionParse(s.to_string()));
                }
                Ok(range)
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.start, &self.end) {
            (Some(s), Some(e)) if s == e => write!(f, "{}", s),
            (s, e) => {
                if let Some(s) = s {
                    write!(f, "{}", s)?;
                }
                f.write_str(":")?;
                if let Some(e) = e {
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

/// A union of version ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionList(Vec<VersionRange>);

impl Default for VersionList {
    fn default() -> Self {
        Self::any()
    }
}

impl VersionList {
    /// The list admitting every version
    pub fn any() -> Self {
        Self(vec![VersionRange::any()])
    }

    pub fn is_any(&self) -> bool {
        self.0.iter().any(|r| r.is_any())
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.0
    }

    /// Parse a comma separated list such as `1.2:1.4,2.0`
    pub fn parse(s: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::VersionParse(s.to_string()));
            }
            ranges.push(VersionRange::parse(part)?);
        }
        Ok(Self::normalized(ranges))
    }

    fn normalized(mut ranges: Vec<VersionRange>) -> Self {
        if ranges.iter().any(|r| r.is_any()) {
            return Self::any();
        }
        ranges.sort();
        ranges.dedup();
        Self(ranges)
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.0.iter().any(|r| r.contains(v))
    }

    /// The versions admitted by both lists, or `None` when they are disjoint
    pub fn intersect(&self, other: &VersionList) -> Option<VersionList> {
        if self.is_any() {
            return Some(other.clone());
        }
        if other.is_any() {
            return Some(self.clone());
        }
        let ranges: Vec<VersionRange> = self
            .0
            .iter()
            .flat_map(|a| other.0.iter().filter_map(move |b| a.intersect(b)))
            .collect();
        (!ranges.is_empty()).then(|| Self::normalized(ranges))
    }

    /// Whether every range of `self` is covered by a range of `outer`
    pub fn within(&self, outer: &VersionList) -> bool {
        outer.is_any() || self.0.iter().all(|r| outer.0.iter().any(|o| r.within(o)))
    }
}

impl fmt::Display for VersionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}
