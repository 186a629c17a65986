//! The capability contract every schema version implements

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::tags::Tagged;

/// Zero-argument constructor for an empty config of one schema version
pub type Factory = fn() -> Box<dyn VersionedConfig>;

/// A config document of one schema version.
///
/// `parse` fills an empty instance obtained from a [`Factory`]. `upgrade`
/// never mutates: it builds the next version's representation from `self`.
/// The newest version is never asked to upgrade.
pub trait VersionedConfig: ConfigDocument + Tagged {
    /// The constant api version of this schema
    fn version(&self) -> &'static str;

    /// Populate `self` from raw YAML.
    ///
    /// With `apply_defaults` the version may fill unset optional fields with
    /// its documented defaults; without it only explicit fields are set.
    fn parse(&mut self, bytes: &[u8], apply_defaults: bool) -> Result<()>;

    /// Convert into the next schema version
    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>>;
}

impl dyn VersionedConfig {
    /// Borrow the concrete schema type, if it matches
    pub fn downcast_ref<T: VersionedConfig>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether this config is of the concrete schema type `T`
    pub fn is<T: VersionedConfig>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Serialization view shared by every config type.
///
/// Implemented for anything serializable; schema versions get it for free.
pub trait ConfigDocument: Any + fmt::Debug + Send + Sync {
    /// JSON view used by the tag validator
    fn to_value(&self) -> Result<serde_json::Value>;

    /// Render back to YAML
    fn to_yaml(&self) -> Result<String>;

    fn as_any(&self) -> &dyn Any;
}

impl<T> ConfigDocument for T
where
    T: Serialize + Any + fmt::Debug + Send + Sync,
{
    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Strictly decode a YAML document into a schema type
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_yaml::from_slice(bytes)?)
}
