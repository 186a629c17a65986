//! Resolution and upgrade engine
//!
//! ```text
//! bytes ─▶ probe ─▶ registry.find ─▶ factory().parse ─▶ tags::validate ─▶ config
//!                                                                           │
//!                       upgrade_steps: config ─▶ next ─▶ ... ─▶ latest ◀────┘
//! ```
//!
//! Every stage wraps its failure with the stage and version involved. Nothing
//! is retried and no partially parsed or partially upgraded config is ever
//! returned.

use std::cmp::Ordering;
use std::iter;

use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::probe::probe_api_version;
use crate::registry::SchemaRegistry;
use crate::tags;
use crate::version::ApiVersion;
use crate::versioned::VersionedConfig;

impl SchemaRegistry {
    /// Parse and validate a document with the rules of the version it claims.
    ///
    /// The result keeps the document's own version; nothing is upgraded.
    pub fn parse_config(&self, bytes: &[u8], apply_defaults: bool) -> Result<Box<dyn VersionedConfig>> {
        let api_version = probe_api_version(bytes)?;
        debug!(%api_version, apply_defaults, "probed api version");

        let factory = self
            .find(&api_version)
            .ok_or_else(|| SchemaError::UnknownVersion(api_version.clone()))?;

        let mut cfg = factory();
        cfg.parse(bytes, apply_defaults)
            .map_err(|e| SchemaError::SchemaParse {
                version: api_version.clone(),
                source: Box::new(e),
            })?;

        tags::validate(cfg.as_ref())?;

        if cfg.version() != api_version {
            return Err(SchemaError::VersionMismatch {
                expected: api_version,
                actual: cfg.version().to_string(),
            });
        }

        Ok(cfg)
    }

    /// The upgrade sequence starting at `cfg`.
    ///
    /// Yields `cfg` itself, then each single-step upgrade until the latest
    /// version. The sequence ends after the first error. It never takes more
    /// than `len() - 1` steps; a chain that would is reported as
    /// [`SchemaError::BrokenUpgradeChain`].
    pub fn upgrade_steps(
        &self,
        cfg: Box<dyn VersionedConfig>,
    ) -> impl Iterator<Item = Result<Box<dyn VersionedConfig>>> + '_ {
        let max_steps = self.len().saturating_sub(1);
        let mut taken = 0;

        iter::successors(Some(Ok(cfg)), move |prev: &Result<Box<dyn VersionedConfig>>| {
            let current = prev.as_ref().ok()?;
            let from = current.version();
            if from == self.latest() {
                return None;
            }
            if taken == max_steps {
                return Some(Err(SchemaError::BrokenUpgradeChain {
                    from: from.to_string(),
                    reason: format!("{} not reached within {} steps", self.latest(), max_steps),
                }));
            }
            taken += 1;
            Some(self.upgrade_once(current.as_ref()))
        })
    }

    /// Upgrade `cfg` one version at a time until it is the latest version
    pub fn upgrade_to_latest(&self, cfg: Box<dyn VersionedConfig>) -> Result<Box<dyn VersionedConfig>> {
        let from = cfg.version();
        let upgraded = self
            .upgrade_steps(cfg)
            .last()
            .unwrap_or_else(|| {
                Err(SchemaError::BrokenUpgradeChain {
                    from: from.to_string(),
                    reason: "upgrade sequence was empty".to_string(),
                })
            })?;

        if upgraded.version() != from {
            info!(from, to = upgraded.version(), "upgraded config");
        }
        Ok(upgraded)
    }

    /// Check that `api_version` is exactly the latest registered version.
    ///
    /// Older versions fail with [`SchemaError::StaleConfig`], newer ones with
    /// [`SchemaError::FutureConfig`].
    pub fn check_version_is_latest(&self, api_version: &str) -> Result<()> {
        let parsed = ApiVersion::parse(api_version)?;
        let latest = ApiVersion::parse(self.latest())?;

        match parsed.cmp(&latest) {
            Ordering::Less => Err(SchemaError::StaleConfig {
                found: api_version.to_string(),
                latest: self.latest().to_string(),
            }),
            Ordering::Greater => Err(SchemaError::FutureConfig {
                found: api_version.to_string(),
                latest: self.latest().to_string(),
            }),
            Ordering::Equal => Ok(()),
        }
    }

    fn upgrade_once(&self, cfg: &dyn VersionedConfig) -> Result<Box<dyn VersionedConfig>> {
        let from = cfg.version();
        let next = cfg.upgrade().map_err(|e| SchemaError::Upgrade {
            from: from.to_string(),
            source: Box::new(e),
        })?;

        let to = next.version();
        if to == from {
            return Err(SchemaError::BrokenUpgradeChain {
                from: from.to_string(),
                reason: "upgrade did not change the version".to_string(),
            });
        }
        if !self.contains(to) {
            return Err(SchemaError::BrokenUpgradeChain {
                from: from.to_string(),
                reason: format!("upgrade produced unregistered version {}", to),
            });
        }

        debug!(from, to, "upgrade step");
        Ok(next)
    }
}

/// Parse and validate a document against the built-in versions
pub fn parse_config(bytes: &[u8], apply_defaults: bool) -> Result<Box<dyn VersionedConfig>> {
    SchemaRegistry::builtin().parse_config(bytes, apply_defaults)
}

/// Upgrade a config to the latest built-in version
pub fn upgrade_to_latest(cfg: Box<dyn VersionedConfig>) -> Result<Box<dyn VersionedConfig>> {
    SchemaRegistry::builtin().upgrade_to_latest(cfg)
}

/// Check a tag against the latest built-in version
pub fn check_version_is_latest(api_version: &str) -> Result<()> {
    SchemaRegistry::builtin().check_version_is_latest(api_version)
}

/// Parse a document of any known version and bring it up to the latest one
pub fn load_latest(bytes: &[u8], apply_defaults: bool) -> Result<Box<dyn VersionedConfig>> {
    let registry = SchemaRegistry::builtin();
    registry.upgrade_to_latest(registry.parse_config(bytes, apply_defaults)?)
}
