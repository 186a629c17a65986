//! Version probe: read `apiVersion` without parsing the rest of a document

use serde::Deserialize;

use crate::error::{Result, SchemaError};

/// The only field read before the schema version is known
#[derive(Debug, Deserialize)]
struct ApiVersionHeader {
    #[serde(rename = "apiVersion", default)]
    api_version: Option<String>,
}

/// Extract the `apiVersion` a document claims.
///
/// Other keys are ignored at this stage, so a document that is invalid for
/// its schema still probes successfully.
pub fn probe_api_version(bytes: &[u8]) -> Result<String> {
    let header: ApiVersionHeader = serde_yaml::from_slice(bytes)
        .map_err(|e| SchemaError::MalformedDocument(e.to_string()))?;

    match header.api_version {
        Some(version) if !version.trim().is_empty() => Ok(version.trim().to_string()),
        Some(_) => Err(SchemaError::MalformedDocument("apiVersion is empty".to_string())),
        None => Err(SchemaError::MalformedDocument("apiVersion is missing".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_ignores_other_fields() {
        let doc = b"apiVersion: pipeline/v1alpha2\nkind: Config\nbuild:\n  whatever: [1, 2]\n";
        assert_eq!(probe_api_version(doc).unwrap(), "pipeline/v1alpha2");
    }

    #[test]
    fn test_probe_trims_whitespace() {
        let doc = b"apiVersion: \" pipeline/v1beta1\\t\"\n";
        assert_eq!(probe_api_version(doc).unwrap(), "pipeline/v1beta1");
        let err = probe_api_version(b"apiVersion: \"   \"\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn test_probe_missing_version() {
        let err = probe_api_version(b"kind: Config\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn test_probe_empty_version() {
        let err = probe_api_version(b"apiVersion: \"\"\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn test_probe_malformed_yaml() {
        let err = probe_api_version(b"apiVersion: [unterminated\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn test_probe_non_mapping() {
        let err = probe_api_version(b"just a scalar\n").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedDocument(_)));
    }
}
