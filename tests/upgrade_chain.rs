//! Every built-in version upgrades to the latest one

use pipeline_schemas::schemas::{latest, v1alpha1, v1alpha2, v1alpha3};
use pipeline_schemas::{ApiVersion, ConfigDocument, SchemaError, SchemaRegistry};

const V1ALPHA1: &str = include_str!("fixtures/v1alpha1.yaml");
const V1ALPHA2: &str = include_str!("fixtures/v1alpha2.yaml");
const V1ALPHA3: &str = include_str!("fixtures/v1alpha3.yaml");
const V1BETA1: &str = include_str!("fixtures/v1beta1.yaml");

fn fixtures() -> [(&'static str, &'static str); 4] {
    [
        (v1alpha1::VERSION, V1ALPHA1),
        (v1alpha2::VERSION, V1ALPHA2),
        (v1alpha3::VERSION, V1ALPHA3),
        (latest::VERSION, V1BETA1),
    ]
}

#[test]
fn test_builtin_versions_in_release_order() {
    let registry = SchemaRegistry::builtin();
    let versions: Vec<&str> = registry.versions().collect();
    assert_eq!(
        versions,
        vec![v1alpha1::VERSION, v1alpha2::VERSION, v1alpha3::VERSION, latest::VERSION]
    );
    assert_eq!(registry.latest(), latest::VERSION);

    let parsed: Vec<ApiVersion> = versions.iter().map(|v| ApiVersion::parse(v).unwrap()).collect();
    assert!(parsed.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_every_fixture_reaches_latest() {
    let registry = SchemaRegistry::builtin();

    for (version, doc) in fixtures() {
        for apply_defaults in [false, true] {
            let cfg = registry.parse_config(doc.as_bytes(), apply_defaults).unwrap();
            assert_eq!(cfg.version(), version);

            let steps: Vec<_> = registry.upgrade_steps(cfg).collect::<Result<_, _>>().unwrap();
            assert!(steps.len() <= registry.len(), "{} took {} steps", version, steps.len() - 1);
            assert_eq!(steps.last().unwrap().version(), latest::VERSION);
        }
    }
}

#[test]
fn test_each_step_advances_one_version() {
    let registry = SchemaRegistry::builtin();
    let cfg = registry.parse_config(V1ALPHA1.as_bytes(), false).unwrap();
    let visited: Vec<&str> = registry
        .upgrade_steps(cfg)
        .map(|step| step.unwrap().version())
        .collect();
    assert_eq!(visited, registry.versions().collect::<Vec<_>>());
}

#[test]
fn test_v1alpha1_carries_to_latest() {
    let cfg = pipeline_schemas::load_latest(V1ALPHA1.as_bytes(), false).unwrap();
    let cfg = cfg.downcast_ref::<latest::PipelineConfig>().unwrap();

    assert_eq!(cfg.api_version, latest::VERSION);
    assert_eq!(cfg.metadata.name.as_deref(), Some("web"));
    assert!(cfg.build.tag_policy.as_ref().unwrap().git_commit.is_some());

    let web = &cfg.build.artifacts[0];
    assert_eq!(web.image, "registry.local/web");
    assert_eq!(web.context.as_deref(), Some("./web"));
    assert_eq!(
        web.docker.as_ref().unwrap().dockerfile.as_deref(),
        Some("Dockerfile.prod")
    );

    // nothing was written for the worker, so nothing is invented for it
    let worker = &cfg.build.artifacts[1];
    assert!(worker.context.is_none());
    assert!(worker.docker.is_none());

    let release = &cfg.deploy.helm.as_ref().unwrap().releases[0];
    assert_eq!(release.values_files, vec!["charts/web/values.yaml".to_string()]);
    assert!(release.namespace.is_none());
}

#[test]
fn test_v1alpha2_template_is_rewritten() {
    let cfg = pipeline_schemas::load_latest(V1ALPHA2.as_bytes(), false).unwrap();
    let cfg = cfg.downcast_ref::<latest::PipelineConfig>().unwrap();

    let template = &cfg.build.tag_policy.as_ref().unwrap().env_template.as_ref().unwrap().template;
    assert_eq!(template, "{{.IMAGE}}:{{.VERSION}}");
    assert_eq!(
        cfg.build.artifacts[1].bazel.as_ref().unwrap().target,
        "//worker:image.tar"
    );
    assert_eq!(cfg.deploy.kubectl.as_ref().unwrap().manifests.len(), 2);
}

#[test]
fn test_no_defaults_are_fabricated_by_upgrade() {
    let doc = "apiVersion: pipeline/v1alpha1\nkind: Config\n";
    let cfg = pipeline_schemas::load_latest(doc.as_bytes(), false).unwrap();
    let cfg = cfg.downcast_ref::<latest::PipelineConfig>().unwrap();

    assert!(cfg.metadata.name.is_none());
    assert!(cfg.build.is_empty());
    assert!(cfg.deploy.is_empty());
    assert!(cfg.profiles.is_empty());
    assert_eq!(cfg.to_yaml().unwrap(), "apiVersion: pipeline/v1beta1\nkind: Config\n");
}

#[test]
fn test_empty_tag_policy_still_upgrades() {
    let doc = "apiVersion: pipeline/v1alpha1\nkind: Config\nbuild:\n  tagPolicy: \"\"\n";
    let registry = SchemaRegistry::builtin();

    for apply_defaults in [false, true] {
        let cfg = registry.parse_config(doc.as_bytes(), apply_defaults).unwrap();
        let upgraded = registry.upgrade_to_latest(cfg).unwrap();
        let upgraded = upgraded.downcast_ref::<latest::PipelineConfig>().unwrap();
        assert_eq!(upgraded.build.tag_policy.is_some(), apply_defaults);
    }
}

#[test]
fn test_digest_template_blocks_upgrade() {
    let doc = "apiVersion: pipeline/v1alpha3\nkind: Config\nbuild:\n  tagPolicy:\n    envTemplate:\n      template: \"{{.IMAGE_NAME}}@{{.DIGEST}}\"\n";
    let err = pipeline_schemas::load_latest(doc.as_bytes(), false).unwrap_err();
    match err {
        SchemaError::Upgrade { from, source } => {
            assert_eq!(from, v1alpha3::VERSION);
            assert!(matches!(*source, SchemaError::Conversion { .. }));
        }
        other => panic!("expected Upgrade, got {:?}", other),
    }
}
