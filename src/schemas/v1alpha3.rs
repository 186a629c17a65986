//! `pipeline/v1alpha3`
//!
//! Adds build execution environments (`local` or `cluster`), the `kustomize`
//! deployer and named `profiles` that override `build` and `deploy`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::schemas::v1beta1 as next;
use crate::tags::{FieldTag, Tagged};
use crate::versioned::{decode, VersionedConfig};

pub use super::v1alpha2::{
    Artifact, BazelArtifact, DockerArtifact, EnvTemplate, GitCommit, HelmDeploy, HelmRelease,
    KubectlDeploy, Metadata, Sha256, TagPolicy, DEFAULT_MANIFESTS,
};

pub const VERSION: &str = "pipeline/v1alpha3";

/// Template placeholder dropped in v1beta1
pub const DIGEST_PLACEHOLDER: &str = "{{.DIGEST}}";

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
    #[serde(default, skip_serializing_if = "DeployConfig::is_empty")]
    pub deploy: DeployConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_policy: Option<TagPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalBuild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterBuild>,
}

impl BuildConfig {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
            && self.tag_policy.is_none()
            && self.local.is_none()
            && self.cluster.is_none()
    }

    pub(crate) fn set_defaults(&mut self) {
        self.tag_policy.get_or_insert_with(TagPolicy::git_commit);
        if self.cluster.is_none() {
            self.local.get_or_insert_with(LocalBuild::default);
        }
        self.artifacts.iter_mut().for_each(Artifact::set_defaults);
    }
}

/// Build with the local toolchain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocalBuild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
}

/// Build in-cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterBuild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret: Option<String>,
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
pub struct KustomizeDeploy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A named override of `build` and `deploy`
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

    // Profiles are overrides and get no defaults of their own.
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
        let profiles = self
            .profiles
            .iter()
            .enumerate()
            .map(|(i, profile)| {
                Ok(next::Profile {
                    name: profile.name.clone(),
                    build: profile
                        .build
                        .as_ref()
                        .map(|build| upgrade_build(build, &format!("profiles[{}].build", i)))
                        .transpose()?,
                    deploy: profile.deploy.as_ref().map(upgrade_deploy),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(next::PipelineConfig {
            api_version: next::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            build: upgrade_build(&self.build, "build")?,
            deploy: upgrade_deploy(&self.deploy),
            profiles,
            test: Vec::new(),
        }))
    }
}

fn upgrade_build(build: &BuildConfig, at: &str) -> Result<next::BuildConfig> {
    let tag_policy = match &build.tag_policy {
        Some(policy) => Some(upgrade_tag_policy(policy, at)?),
        None => None,
    };
    Ok(next::BuildConfig {
        tag_policy,
        ..build.clone()
    })
}

fn upgrade_tag_policy(policy: &TagPolicy, at: &str) -> Result<TagPolicy> {
    let Some(env) = &policy.env_template else {
        return Ok(policy.clone());
    };

    if env.template.contains(DIGEST_PLACEHOLDER) {
        return Err(SchemaError::Conversion {
            from: VERSION.to_string(),
            to: next::VERSION.to_string(),
            field: format!("{}.tagPolicy.envTemplate.template", at),
            reason: format!("{} has no equivalent in {}", DIGEST_PLACEHOLDER, next::VERSION),
        });
    }

    Ok(TagPolicy {
        env_template: Some(EnvTemplate {
            template: env.template.replace("{{.IMAGE_NAME}}", next::IMAGE_PLACEHOLDER),
        }),
        ..policy.clone()
    })
}

fn upgrade_deploy(deploy: &DeployConfig) -> next::DeployConfig {
    next::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.as_ref().map(|helm| next::HelmDeploy {
            releases: helm
                .releases
                .iter()
                .map(|release| next::HelmRelease {
                    name: release.name.clone(),
                    chart_path: release.chart_path.clone(),
                    values_files: release.values_file_path.iter().cloned().collect(),
                    namespace: release.namespace.clone(),
                })
                .collect(),
        }),
        kustomize: deploy.kustomize.clone(),
    }
}
