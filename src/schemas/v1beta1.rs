//! `pipeline/v1beta1`, the latest schema
//!
//! Changes from v1alpha3:
//! - helm releases take a list of `valuesFiles` instead of one `valuesFilePath`
//! - `envTemplate` uses `{{.IMAGE}}` in place of `{{.IMAGE_NAME}}`; the
//!   `{{.DIGEST}}` placeholder is gone
//! - a top-level `test` section runs structure tests against built images

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::tags::{FieldTag, Tagged};
use crate::versioned::{decode, VersionedConfig};

pub use super::v1alpha3::{
    Artifact, BazelArtifact, BuildConfig, ClusterBuild, DockerArtifact, EnvTemplate, GitCommit,
    KubectlDeploy, KustomizeDeploy, LocalBuild, Metadata, Sha256, TagPolicy, DEFAULT_MANIFESTS,
};

pub const VERSION: &str = "pipeline/v1beta1";

/// Image reference placeholder understood by `envTemplate`
pub const IMAGE_PLACEHOLDER: &str = "{{.IMAGE}}";

const TAGS: &[FieldTag] = &[
    FieldTag::Required("kind"),
    FieldTag::Enum {
        path: "kind",
        values: &["Config"],
    },
    // build
    FieldTag::OneOf {
        path: "build",
        fields: &["local", "cluster"],
    },
    FieldTag::OneOf {
        path: "build.tagPolicy",
        fields: &["gitCommit", "sha256", "envTemplate"],
    },
    FieldTag::Required("build.tagPolicy.envTemplate.template"),
    FieldTag::Required("build.artifacts[].image"),
    FieldTag::OneOf {
        path: "build.artifacts[]",
        fields: &["docker", "bazel"],
    },
    FieldTag::Required("build.artifacts[].bazel.target"),
    // test
    FieldTag::Required("test[].image"),
    FieldTag::Required("test[].structureTests"),
    // deploy
    FieldTag::OneOf {
        path: "deploy",
        fields: &["kubectl", "helm", "kustomize"],
    },
    FieldTag::Required("deploy.helm.releases[].name"),
    FieldTag::Required("deploy.helm.releases[].chartPath"),
    // profiles
    FieldTag::Required("profiles[].name"),
    FieldTag::OneOf {
        path: "profiles[].build",
        fields: &["local", "cluster"],
    },
    FieldTag::OneOf {
        path: "profiles[].build.tagPolicy",
        fields: &["gitCommit", "sha256", "envTemplate"],
    },
    FieldTag::Required("profiles[].build.tagPolicy.envTemplate.template"),
    FieldTag::Required("profiles[].build.artifacts[].image"),
    FieldTag::OneOf {
        path: "profiles[].build.artifacts[]",
        fields: &["docker", "bazel"],
    },
    FieldTag::Required("profiles[].build.artifacts[].bazel.target"),
    FieldTag::OneOf {
        path: "profiles[].deploy",
        fields: &["kubectl", "helm", "kustomize"],
    },
    FieldTag::Required("profiles[].deploy.helm.releases[].name"),
    FieldTag::Required("profiles[].deploy.helm.releases[].chartPath"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "BuildConfig::is_empty")]
    pub build: BuildConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "DeployConfig::is_empty")]
    pub deploy: DeployConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

/// Structure tests to run against one built image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestCase {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub structure_tests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeploy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeDeploy>,
}

impl DeployConfig {
    pub fn is_empty(&self) -> bool {
        self.kubectl.is_none() && self.helm.is_none() && self.kustomize.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelmDeploy {
    #[serde(default)]
    pub releases: Vec<HelmRelease>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelmRelease {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chart_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            api_version: VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    fn set_defaults(&mut self) {
        self.build.set_defaults();
        if let Some(kustomize) = &mut self.deploy.kustomize {
            kustomize.path.get_or_insert_with(|| ".".to_string());
        }
        if self.deploy.is_empty() {
            self.deploy.kubectl = Some(KubectlDeploy {
                manifests: vec![DEFAULT_MANIFESTS.to_string()],
            });
        }
    }
}

/// Factory registered for [`VERSION`]
pub fn new_pipeline() -> Box<dyn VersionedConfig> {
    Box::new(PipelineConfig::new())
}

impl Tagged for PipelineConfig {
    fn tags(&self) -> &'static [FieldTag] {
        TAGS
    }
}

impl VersionedConfig for PipelineConfig {
    fn version(&self) -> &'static str {
        VERSION
    }

    fn parse(&mut self, bytes: &[u8], apply_defaults: bool) -> Result<()> {
        *self = decode(bytes)?;
        if apply_defaults {
            self.set_defaults();
        }
        Ok(())
    }

    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>> {
        Err(SchemaError::Conversion {
            from: VERSION.to_string(),
            to: VERSION.to_string(),
            field: "apiVersion".to_string(),
            reason: "already the latest version".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::check_tags;

    fn parse(doc: &str, apply_defaults: bool) -> PipelineConfig {
        let mut cfg = PipelineConfig::new();
        cfg.parse(doc.as_bytes(), apply_defaults).unwrap();
        cfg
    }

    #[test]
    fn test_parse_test_section() {
        let mut cfg = PipelineConfig::new();
        cfg.parse(
            b"apiVersion: pipeline/v1beta1\nkind: Config\ntest:\n  - image: app\n    structureTests: [./tests/*.yaml]\n",
            false,
        )
        .unwrap();
        assert_eq!(cfg.test[0].structure_tests, vec!["./tests/*.yaml".to_string()]);
    }

    #[test]
    fn test_values_file_path_is_gone() {
        let mut cfg = PipelineConfig::new();
        let result = cfg.parse(
            b"apiVersion: pipeline/v1beta1\nkind: Config\ndeploy:\n  helm:\n    releases:\n      - name: web\n        chartPath: charts/web\n        valuesFilePath: v.yaml\n",
            false,
        );
        assert!(matches!(result, Err(SchemaError::Yaml(_))));
    }

    #[test]
    fn test_empty_test_case_is_invalid() {
        let cfg = PipelineConfig {
            kind: "Config".to_string(),
            test: vec![TestCase::default()],
            ..PipelineConfig::new()
        };
        let violations = check_tags(&serde_json::to_value(&cfg).unwrap(), cfg.tags());
        assert!(violations.at("test[0].image").is_some());
        assert!(violations.at("test[0].structureTests").is_some());
    }

    #[test]
    fn test_latest_does_not_upgrade() {
        assert!(PipelineConfig::new().upgrade().is_err());
    }

    #[test]
    fn test_profile_build_tags_match_top_level() {
        let cfg = parse(
            "apiVersion: pipeline/v1beta1\nkind: Config\nprofiles:\n  - name: ci\n    build:\n      tagPolicy:\n        envTemplate:\n          template: \"\"\n      artifacts:\n        - image: app\n          docker: {}\n          bazel: {}\n",
            false,
        );
        let violations = check_tags(&serde_json::to_value(&cfg).unwrap(), cfg.tags());
        assert!(violations.at("profiles[0].build.artifacts[0]").is_some());
        assert!(violations.at("profiles[0].build.artifacts[0].bazel.target").is_some());
        assert!(violations.at("profiles[0].build.tagPolicy.envTemplate.template").is_some());
        assert_eq!(violations.len(), 3);
    }
}
