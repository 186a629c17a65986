//! Minimal schema versions for exercising the registry and engine

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::registry::VersionEntry;
use crate::tags::{FieldTag, Tagged};
use crate::versioned::{decode, Factory, VersionedConfig};

/// A chain link whose version and successor are fixed at construction
#[derive(Debug, Serialize)]
pub(crate) struct FakeConfig {
    #[serde(skip)]
    version: &'static str,
    #[serde(skip)]
    next: Option<Factory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FakeDocument {
    #[allow(dead_code)]
    api_version: String,
    name: Option<String>,
}

const FAKE_TAGS: &[FieldTag] = &[FieldTag::Required("name")];

impl FakeConfig {
    fn boxed(version: &'static str, next: Option<Factory>) -> Box<dyn VersionedConfig> {
        Box::new(Self {
            version,
            next,
            name: None,
        })
    }
}

impl Tagged for FakeConfig {
    fn tags(&self) -> &'static [FieldTag] {
        FAKE_TAGS
    }
}

impl VersionedConfig for FakeConfig {
    fn version(&self) -> &'static str {
        self.version
    }

    fn parse(&mut self, bytes: &[u8], _apply_defaults: bool) -> Result<()> {
        let doc: FakeDocument = decode(bytes)?;
        self.name = doc.name;
        Ok(())
    }

    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>> {
        let next = self.next.ok_or_else(|| SchemaError::Conversion {
            from: self.version.to_string(),
            to: "<none>".to_string(),
            field: "apiVersion".to_string(),
            reason: "no successor".to_string(),
        })?;
        let upgraded = next();
        let carried = upgraded
            .as_any()
            .downcast_ref::<FakeConfig>()
            .map(|cfg| FakeConfig {
                version: cfg.version,
                next: cfg.next,
                name: self.name.clone(),
            });
        Ok(match carried {
            Some(cfg) => Box::new(cfg) as Box<dyn VersionedConfig>,
            None => upgraded,
        })
    }
}

pub(crate) fn fake_v1alpha1() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1alpha1", Some(fake_v1alpha2))
}

pub(crate) fn fake_v1alpha2() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1alpha2", Some(fake_v1))
}

pub(crate) fn fake_v1() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1", None)
}

/// Upgrades to itself forever
pub(crate) fn fake_stuck() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1alpha1", Some(fake_stuck))
}

/// Upgrades into a version nobody registered
pub(crate) fn fake_stray() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1alpha1", Some(fake_unregistered))
}

fn fake_unregistered() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v0alpha1", None)
}

/// Fails its only upgrade step
pub(crate) fn fake_broken() -> Box<dyn VersionedConfig> {
    FakeConfig::boxed("v1alpha1", None)
}

pub(crate) fn fake_entries() -> Vec<VersionEntry> {
    vec![
        VersionEntry::new("v1alpha1", fake_v1alpha1),
        VersionEntry::new("v1alpha2", fake_v1alpha2),
        VersionEntry::new("v1", fake_v1),
    ]
}
