//! `pipeline/v1alpha2`
//!
//! Changes from v1alpha1:
//! - `name` moved under `metadata`
//! - `tagPolicy` became an object with exactly one policy set, and gained
//!   `envTemplate`
//! - artifacts name their builder explicitly (`docker` or `bazel`);
//!   `imageName` is now `image` and `workspace` is now `context`
//! - helm releases accept a `namespace`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schemas::v1alpha3 as next;
use crate::tags::{FieldTag, Tagged};
use crate::versioned::{decode, VersionedConfig};

pub use super::v1alpha1::KubectlDeploy;

pub const VERSION: &str = "pipeline/v1alpha2";

/// Manifests deployed when a document names no deployer
pub const DEFAULT_MANIFESTS: &str = "k8s/*.yaml";

const TAGS: &[FieldTag] = &[
    FieldTag::Required("kind"),
    FieldTag::Enum {
        path: "kind",
        values: &["Config"],
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
    FieldTag::OneOf {
        path: "deploy",
        fields: &["kubectl", "helm"],
    },
    FieldTag::Required("deploy.helm.releases[].name"),
    FieldTag::Required("deploy.helm.releases[].chartPath"),
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
    #[serde(default, skip_serializing_if = "DeployConfig::is_empty")]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_policy: Option<TagPolicy>,
}

impl BuildConfig {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.tag_policy.is_none()
    }
}

/// How built images are tagged. Exactly one policy may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<GitCommit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_template: Option<EnvTemplate>,
}

impl TagPolicy {
    pub fn git_commit() -> Self {
        Self {
            git_commit: Some(GitCommit {}),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitCommit {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sha256 {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvTemplate {
    /// Go-style template, e.g. `{{.IMAGE_NAME}}:{{.VERSION}}`
    #[serde(default)]
    pub template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Artifact {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazel: Option<BazelArtifact>,
}

impl Artifact {
    pub(crate) fn set_defaults(&mut self) {
        self.context.get_or_insert_with(|| ".".to_string());
        if self.bazel.is_none() {
            let docker = self.docker.get_or_insert_with(DockerArtifact::default);
            docker.dockerfile.get_or_insert_with(|| "Dockerfile".to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DockerArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BazelArtifact {
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeploy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
}

impl DeployConfig {
    pub fn is_empty(&self) -> bool {
        self.kubectl.is_none() && self.helm.is_none()
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            api_version: VERSION.to_string(),
            ..Default::default()
        }
    }

    fn set_defaults(&mut self) {
        self.build.tag_policy.get_or_insert_with(TagPolicy::git_commit);
        self.build.artifacts.iter_mut().for_each(Artifact::set_defaults);
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
        Ok(Box::new(next::PipelineConfig {
            api_version: next::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            build: next::BuildConfig {
                artifacts: self.build.artifacts.clone(),
                tag_policy: self.build.tag_policy.clone(),
                local: None,
                cluster: None,
            },
            deploy: next::DeployConfig {
                kubectl: self.deploy.kubectl.clone(),
                helm: self.deploy.helm.clone(),
                kustomize: None,
            },
            profiles: Vec::new(),
        }))
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
    fn test_defaults() {
        let cfg = parse(
            "apiVersion: pipeline/v1alpha2\nkind: Config\nbuild:\n  artifacts:\n    - image: app\n    - image: svc\n      bazel:\n        target: //svc:image.tar\n",
            true,
        );
        assert_eq!(cfg.build.tag_policy, Some(TagPolicy::git_commit()));
        assert_eq!(
            cfg.build.artifacts[0].docker.as_ref().unwrap().dockerfile.as_deref(),
            Some("Dockerfile")
        );
        assert!(cfg.build.artifacts[1].docker.is_none());
        assert_eq!(
            cfg.deploy.kubectl.as_ref().unwrap().manifests,
            vec![DEFAULT_MANIFESTS.to_string()]
        );
    }

    #[test]
    fn test_no_defaults_leaves_fields_unset() {
        let cfg = parse("apiVersion: pipeline/v1alpha2\nkind: Config\n", false);
        assert!(cfg.build.tag_policy.is_none());
        assert!(cfg.deploy.is_empty());
    }

    #[test]
    fn test_tag_policy_is_one_of() {
        let cfg = parse(
            "apiVersion: pipeline/v1alpha2\nkind: Config\nbuild:\n  tagPolicy:\n    gitCommit: {}\n    sha256: {}\n",
            false,
        );
        let violations = check_tags(&serde_json::to_value(&cfg).unwrap(), cfg.tags());
        assert!(violations.at("build.tagPolicy").is_some());
    }

    #[test]
    fn test_artifact_builders_are_one_of() {
        let cfg = parse(
            "apiVersion: pipeline/v1alpha2\nkind: Config\nbuild:\n  artifacts:\n    - image: app\n      docker: {}\n      bazel:\n        target: //app\n",
            false,
        );
        let violations = check_tags(&serde_json::to_value(&cfg).unwrap(), cfg.tags());
        assert!(violations.at("build.artifacts[0]").is_some());
    }

    #[test]
    fn test_upgrade_adds_nothing() {
        let cfg = parse(
            "apiVersion: pipeline/v1alpha2\nkind: Config\nmetadata:\n  name: web\n",
            false,
        );
        let upgraded = cfg.upgrade().unwrap();
        let next = upgraded.downcast_ref::<next::PipelineConfig>().unwrap();
        assert_eq!(next.metadata.name.as_deref(), Some("web"));
        assert!(next.build.local.is_none());
        assert!(next.deploy.kustomize.is_none());
        assert!(next.profiles.is_empty());
    }
}
