//! Error types for config resolution and migration

use std::path::PathBuf;

use thiserror::Error;

use crate::tags::TagViolations;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Config resolution errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing api version: {0}")]
    MalformedDocument(String),

    #[error("Unknown api version: '{0}'")]
    UnknownVersion(String),

    #[error("Unable to parse config as {version}: {source}")]
    SchemaParse {
        version: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Invalid config: {0}")]
    Validation(TagViolations),

    #[error("Transforming config from {from}: {source}")]
    Upgrade {
        from: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Cannot convert {field} from {from} to {to}: {reason}")]
    Conversion {
        from: String,
        to: String,
        field: String,
        reason: String,
    },

    #[error("Broken upgrade chain at {from}: {reason}")]
    BrokenUpgradeChain { from: String, reason: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Invalid api version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    #[error("Config version {found} out of date (latest is {latest}): run `pipeline-schema fix`")]
    StaleConfig { found: String, latest: String },

    #[error("Config version {found} is too new for this build (latest is {latest}): upgrade pipeline-schema")]
    FutureConfig { found: String, latest: String },

    #[error("Schema registry has no versions")]
    EmptyRegistry,

    #[error("Api version registered twice: {0}")]
    DuplicateVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// The api version the failing stage was working on, when known
    pub fn api_version(&self) -> Option<&str> {
        match self {
            SchemaError::UnknownVersion(v) => Some(v),
            SchemaError::SchemaParse { version, .. } => Some(version),
            SchemaError::Upgrade { from, .. }
            | SchemaError::Conversion { from, .. }
            | SchemaError::BrokenUpgradeChain { from, .. } => Some(from),
            SchemaError::MalformedVersion { version, .. } => Some(version),
            SchemaError::StaleConfig { found, .. } | SchemaError::FutureConfig { found, .. } => {
                Some(found)
            }
            _ => None,
        }
    }

    /// Whether the document can be brought up to date with `fix`
    pub fn is_stale(&self) -> bool {
        matches!(self, SchemaError::StaleConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_context() {
        let err = SchemaError::Upgrade {
            from: "pipeline/v1alpha1".to_string(),
            source: Box::new(SchemaError::EmptyRegistry),
        };
        assert_eq!(err.api_version(), Some("pipeline/v1alpha1"));
        assert!(SchemaError::EmptyRegistry.api_version().is_none());
    }

    #[test]
    fn test_stale_message_mentions_fix() {
        let err = SchemaError::StaleConfig {
            found: "pipeline/v1alpha1".to_string(),
            latest: "pipeline/v1beta1".to_string(),
        };
        assert!(err.is_stale());
        assert!(err.to_string().contains("pipeline-schema fix"));
    }
}
