//! Reading config documents from disk or stdin

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::versioned::VersionedConfig;

/// Path that selects standard input
pub const STDIN: &str = "-";

/// Read the raw bytes of a config document. `-` reads stdin.
pub fn read_configuration(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();

    let read = if path == Path::new(STDIN) {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map(|_| buf)
    } else {
        fs::read(path)
    };

    let bytes = read.map_err(|source| SchemaError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    debug!(path = %path.display(), len = bytes.len(), "read config");
    Ok(bytes)
}

/// Read a document and parse it with the built-in versions.
///
/// The result keeps the document's own version.
pub fn parse_config_file(path: impl AsRef<Path>, apply_defaults: bool) -> Result<Box<dyn VersionedConfig>> {
    let bytes = read_configuration(path)?;
    SchemaRegistry::builtin().parse_config(&bytes, apply_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::schemas::v1alpha2;

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        match read_configuration(&path).unwrap_err() {
            SchemaError::Read { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Read, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "apiVersion: pipeline/v1alpha2\nkind: Config\nmetadata:\n  name: web").unwrap();

        let cfg = parse_config_file(file.path(), false).unwrap();
        assert_eq!(cfg.version(), v1alpha2::VERSION);
        let cfg = cfg.downcast_ref::<v1alpha2::PipelineConfig>().unwrap();
        assert_eq!(cfg.metadata.name.as_deref(), Some("web"));
    }
}
