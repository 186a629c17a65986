//! Settings for the pipeline-schema tools
//!
//! Supports loading settings from:
//! - Default values
//! - Settings file (pipeline-schemas.toml)
//! - Environment variables (PIPELINE_SCHEMAS__<SECTION>__<KEY>)
//!
//! ## Example settings file (pipeline-schemas.toml):
//! ```toml
//! [parse]
//! apply_defaults = true
//!
//! [upgrade]
//! auto_upgrade = true
//! reject_stale = false
//!
//! [output]
//! format = "yaml"
//!
//! [log]
//! filter = "info"
//! ```

use std::path::Path;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Settings file names searched in the working directory
pub const SETTINGS_FILES: [&str; 2] = ["pipeline-schemas.toml", ".pipeline-schemas.toml"];

/// Tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub parse: ParseSettings,

    #[serde(default)]
    pub upgrade: UpgradeSettings,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSettings {
    /// Fill documented defaults for unset optional fields
    #[serde(default = "default_true")]
    pub apply_defaults: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSettings {
    /// Bring validated documents up to the latest version
    #[serde(default = "default_true")]
    pub auto_upgrade: bool,

    /// Fail validation of documents that are not the latest version
    #[serde(default)]
    pub reject_stale: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
}

/// How configs are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            apply_defaults: true,
        }
    }
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            auto_upgrade: true,
            reject_stale: false,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load settings, with `settings_path` taking precedence over files
    /// found in default locations
    pub fn load_from(settings_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in SETTINGS_FILES {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "pipeline-schemas") {
            let xdg_settings = dirs.config_dir().join(SETTINGS_FILES[0]);
            if xdg_settings.exists() {
                builder = builder.add_source(File::from(xdg_settings).required(false));
            }
        }

        if let Some(path) = settings_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PIPELINE_SCHEMAS")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
