//! Schema Registry
//!
//! An ordered, append-only table of known schema versions, oldest first.
//! Lookup is keyed by api version; order only documents release history.
//! The version the comparator ranks highest is "latest" and is where every
//! upgrade chain ends.
//!
//! The built-in table is process-wide and built exactly once, on the first
//! call to [`SchemaRegistry::builtin`]. Nothing mutates it afterwards, so it
//! can be shared between threads without locking. Embedders and tests that
//! need a different set of versions build their own with
//! [`SchemaRegistry::new`].

use std::sync::OnceLock;

use crate::error::{Result, SchemaError};
use crate::schemas;
use crate::version::ApiVersion;
use crate::versioned::Factory;

/// A registered schema version
#[derive(Debug, Clone, Copy)]
pub struct VersionEntry {
    pub api_version: &'static str,
    pub factory: Factory,
}

impl VersionEntry {
    pub const fn new(api_version: &'static str, factory: Factory) -> Self {
        Self {
            api_version,
            factory,
        }
    }
}

/// The schema version table
#[derive(Debug)]
pub struct SchemaRegistry {
    entries: Vec<VersionEntry>,
    latest: &'static str,
}

impl SchemaRegistry {
    /// Build a registry from entries listed oldest to newest.
    ///
    /// Every tag must be well-formed and unique under the comparator, and
    /// each factory must produce a config reporting its own tag.
    pub fn new(entries: Vec<VersionEntry>) -> Result<Self> {
        let mut parsed: Vec<ApiVersion> = Vec::with_capacity(entries.len());

        for entry in &entries {
            let version = ApiVersion::parse(entry.api_version)?;
            if parsed.contains(&version) {
                return Err(SchemaError::DuplicateVersion(entry.api_version.to_string()));
            }

            let produced = (entry.factory)().version();
            if produced != entry.api_version {
                return Err(SchemaError::VersionMismatch {
                    expected: entry.api_version.to_string(),
                    actual: produced.to_string(),
                });
            }

            parsed.push(version);
        }

        let latest = parsed
            .iter()
            .zip(&entries)
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, entry)| entry.api_version)
            .ok_or(SchemaError::EmptyRegistry)?;

        Ok(Self { entries, latest })
    }

    /// The built-in schema versions shipped with this crate
    pub fn builtin() -> &'static SchemaRegistry {
        static BUILTIN: OnceLock<SchemaRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let registry = SchemaRegistry::new(schemas::entries())
                .expect("built-in schema versions are well-formed");
            tracing::debug!(
                versions = registry.len(),
                latest = registry.latest(),
                "initialized schema registry"
            );
            registry
        })
    }

    /// Find the factory for an api version
    pub fn find(&self, api_version: &str) -> Option<Factory> {
        let found = self
            .entries
            .iter()
            .find(|entry| entry.api_version == api_version)
            .map(|entry| entry.factory);
        if found.is_none() {
            tracing::debug!(api_version, "api version not registered");
        }
        found
    }

    /// Whether an api version is registered
    pub fn contains(&self, api_version: &str) -> bool {
        self.entries.iter().any(|entry| entry.api_version == api_version)
    }

    /// The api version every upgrade chain ends at
    pub fn latest(&self) -> &'static str {
        self.latest
    }

    /// Registered api versions in registration order
    pub fn versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.api_version)
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
