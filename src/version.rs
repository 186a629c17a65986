//! Api version parsing and ordering
//!
//! Tags look like `pipeline/v1alpha2`: an optional group, then `v<major>`
//! optionally followed by a pre-release stage and counter. They are mapped
//! onto semver so ordering follows release order:
//!
//! ```text
//! v1alpha1 -> 1.0.0-alpha.1
//! v1alpha2 -> 1.0.0-alpha.2
//! v1beta1  -> 1.0.0-beta.1
//! v1       -> 1.0.0
//! v2alpha1 -> 2.0.0-alpha.1
//! ```
//!
//! The group never takes part in the comparison.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use semver::{Prerelease, Version};

use crate::error::{Result, SchemaError};

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?P<group>[a-z0-9][a-z0-9.-]*)/)?v(?P<major>\d+)(?:(?P<stage>alpha|beta)(?P<n>\d+))?$")
            .expect("valid regex")
    })
}

/// Release stage of an api version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Alpha(u64),
    Beta(u64),
    Stable,
}

/// A parsed, totally ordered api version
#[derive(Debug, Clone)]
pub struct ApiVersion {
    group: Option<String>,
    version: Version,
}

impl ApiVersion {
    /// Parse a tag such as `pipeline/v1alpha2` or `v1`
    pub fn parse(tag: &str) -> Result<Self> {
        let malformed = |reason: &str| SchemaError::MalformedVersion {
            version: tag.to_string(),
            reason: reason.to_string(),
        };

        let caps = tag_pattern()
            .captures(tag)
            .ok_or_else(|| malformed("expected [<group>/]v<major>[alpha<n>|beta<n>]"))?;

        let major: u64 = caps["major"]
            .parse()
            .map_err(|_| malformed("major version out of range"))?;

        let pre = match (caps.name("stage"), caps.name("n")) {
            (Some(stage), Some(n)) => {
                let n: u64 = n
                    .as_str()
                    .parse()
                    .map_err(|_| malformed("stage counter out of range"))?;
                Prerelease::new(&format!("{}.{}", stage.as_str(), n))
                    .map_err(|e| malformed(&e.to_string()))?
            }
            _ => Prerelease::EMPTY,
        };

        let mut version = Version::new(major, 0, 0);
        version.pre = pre;

        Ok(Self {
            group: caps.name("group").map(|g| g.as_str().to_string()),
            version,
        })
    }

    /// The group prefix, if any
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The semver this tag orders as
    pub fn semver(&self) -> &Version {
        &self.version
    }

    /// Major version number
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// Release stage
    pub fn stage(&self) -> Stage {
        let pre = self.version.pre.as_str();
        let counter = |s: &str| s.parse().unwrap_or_default();
        if let Some(n) = pre.strip_prefix("alpha.") {
            Stage::Alpha(counter(n))
        } else if let Some(n) = pre.strip_prefix("beta.") {
            Stage::Beta(counter(n))
        } else {
            Stage::Stable
        }
    }

    /// The first stable release of the next major version, same group
    pub fn next_major(&self) -> Self {
        Self {
            group: self.group.clone(),
            version: Version::new(self.version.major + 1, 0, 0),
        }
    }

    /// Check if this is a major version bump from another version
    pub fn is_major_bump_from(&self, other: &ApiVersion) -> bool {
        self.version.major > other.version.major
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(group) = &self.group {
            write!(f, "{}/", group)?;
        }
        write!(f, "v{}", self.version.major)?;
        match self.stage() {
            Stage::Alpha(n) => write!(f, "alpha{}", n),
            Stage::Beta(n) => write!(f, "beta{}", n),
            Stage::Stable => Ok(()),
        }
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}
