//! `pipeline/v1alpha1`: the original pipeline config shape
//!
//! ```yaml
//! apiVersion: pipeline/v1alpha1
//! kind: Config
//! name: web
//! build:
//!   tagPolicy: gitCommit
//!   artifacts:
//!     - imageName: registry.local/web
//!       workspace: ./web
//! deploy:
//!   kubectl:
//!     manifests: ["k8s/*.yaml"]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::schemas::v1alpha2 as next;
use crate::tags::{FieldTag, Tagged};
use crate::versioned::{decode, VersionedConfig};

pub const VERSION: &str = "pipeline/v1alpha1";

const TAGS: &[FieldTag] = &[
    FieldTag::Required("kind"),
    FieldTag::Enum {
        path: "kind",
        values: &["Config"],
    },
    FieldTag::Enum {
        path: "build.tagPolicy",
        values: &["gitCommit", "sha256"],
    },
    FieldTag::Required("build.artifacts[].imageName"),
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BuildConfig::is_empty")]
    pub build: BuildConfig,
    #[serde(default, skip_serializing_if = "DeployConfig::is_empty")]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// `gitCommit` or `sha256`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_policy: Option<String>,
}

impl BuildConfig {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.tag_policy.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Artifact {
    #[serde(default)]
    pub image_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
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
pub struct KubectlDeploy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
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
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            api_version: VERSION.to_string(),
            ..Default::default()
        }
    }

    fn set_defaults(&mut self) {
        self.build.tag_policy.get_or_insert_with(|| "gitCommit".to_string());
        for artifact in &mut self.build.artifacts {
            artifact.workspace.get_or_insert_with(|| ".".to_string());
            artifact.dockerfile_path.get_or_insert_with(|| "Dockerfile".to_string());
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
        // An empty policy is unset, not an unknown policy
        self.build.tag_policy = self.build.tag_policy.take().filter(|p| !p.is_empty());
        if apply_defaults {
            self.set_defaults();
        }
        Ok(())
    }

    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>> {
        let tag_policy = self
            .build
            .tag_policy
            .as_deref()
            .map(upgrade_tag_policy)
            .transpose()?;

        Ok(Box::new(next::PipelineConfig {
            api_version: next::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: next::Metadata {
                name: self.name.clone(),
            },
            build: next::BuildConfig {
                artifacts: self.build.artifacts.iter().map(upgrade_artifact).collect(),
                tag_policy,
            },
            deploy: next::DeployConfig {
                kubectl: self.deploy.kubectl.clone(),
                helm: self.deploy.helm.as_ref().map(|helm| next::HelmDeploy {
                    releases: helm.releases.iter().map(upgrade_release).collect(),
                }),
            },
        }))
    }
}

fn upgrade_tag_policy(policy: &str) -> Result<next::TagPolicy> {
    match policy {
        "gitCommit" => Ok(next::TagPolicy {
            git_commit: Some(next::GitCommit {}),
            ..Default::default()
        }),
        "sha256" => Ok(next::TagPolicy {
            sha256: Some(next::Sha256 {}),
            ..Default::default()
        }),
        other => Err(SchemaError::Conversion {
            from: VERSION.to_string(),
            to: next::VERSION.to_string(),
            field: "build.tagPolicy".to_string(),
            reason: format!("unknown tag policy '{}'", other),
        }),
    }
}

fn upgrade_artifact(artifact: &Artifact) -> next::Artifact {
    next::Artifact {
        image: artifact.image_name.clone(),
        context: artifact.workspace.clone(),
        docker: artifact
            .dockerfile_path
            .as_ref()
            .map(|dockerfile| next::DockerArtifact {
                dockerfile: Some(dockerfile.clone()),
                ..Default::default()
            }),
        bazel: None,
    }
}

fn upgrade_release(release: &HelmRelease) -> next::HelmRelease {
    next::HelmRelease {
        name: release.name.clone(),
        chart_path: release.chart_path.clone(),
        values_file_path: release.values_file_path.clone(),
        namespace: None,
    }
}
