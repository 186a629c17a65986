//! Pipeline Schemas
//!
//! Versioned pipeline configuration: every document names its schema in a
//! top-level `apiVersion`, and this crate turns such a document into an
//! in-memory config of the latest schema.
//!
//! ## Features
//!
//! - **Version Probe**: reads only `apiVersion`, before any full parse
//! - **Append-only Registry**: one frozen module per released version
//! - **Tag Validation**: required, one-of and enum rules declared per schema
//! - **Upgrade Chain**: each version converts itself into its successor
//! - **Staleness Check**: tells `fix`-able documents apart from too-new ones
//!
//! ## Architecture
//!
//! ```text
//! bytes ─▶ probe ─▶ registry ─▶ parse ─▶ validate ─▶ upgrade* ─▶ latest
//!
//! schemas/
//! ├── v1alpha1.rs
//! ├── v1alpha2.rs
//! ├── v1alpha3.rs
//! └── v1beta1.rs   (latest)
//! ```

pub mod error;
pub mod probe;
pub mod registry;
pub mod resolve;
pub mod schemas;
pub mod settings;
pub mod source;
pub mod tags;
pub mod version;
pub mod versioned;

#[cfg(test)]
mod testing;

pub use error::{Result, SchemaError};
pub use probe::probe_api_version;
pub use registry::{SchemaRegistry, VersionEntry};
pub use resolve::{check_version_is_latest, load_latest, parse_config, upgrade_to_latest};
pub use settings::Settings;
pub use source::{parse_config_file, read_configuration};
pub use tags::{FieldTag, TagViolation, TagViolations, Tagged};
pub use version::ApiVersion;
pub use versioned::{ConfigDocument, Factory, VersionedConfig};
