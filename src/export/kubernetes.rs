//! `kubernetes` target: plain manifests plus a kustomization, all under `k8s/`.
//!
//! Agents become a Deployment behind a Service; tasks become a Job. Settings travel in a
//! ConfigMap, credentials in a Secret that only names its keys. Placement hints come from
//! `extensions.kubernetes` (`image`, `replicas`, `namespace`).

mod configmap;
mod interface;
mod kustomization;
mod workload;

pub(crate) use configmap::{secret_keys, settings};

use super::{ExportContext, ExportTarget, Exporter, Feature, FeaturePolicy, Generator};
use crate::manifest::ManifestKind;
use crate::testgen::TestProfile;
use semver::Version;
use serde_json::{json, Value};

pub const TARGET_NAME: &str = "kubernetes";

/// Directory every resource is written to.
pub const RESOURCE_DIR: &str = "k8s";

/// Port the generated service listens on inside the container.
pub const CONTAINER_PORT: u64 = 8000;

/// Port the Service exposes.
pub const SERVICE_PORT: u64 = 80;

/// Placement hints read from `extensions.kubernetes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hints {
    pub image: String,
    pub replicas: u64,
    pub namespace: String,
}

impl Hints {
    pub fn from_context(ctx: &ExportContext<'_>) -> Self {
        let ext = ctx.manifest.extension(TARGET_NAME);
        let field = |key: &str| ext.and_then(|e| e.get(key));
        let image = field("image")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{}:{}",
                    ctx.name(),
                    ctx.metadata.version.as_deref().unwrap_or("latest")
                )
            });
        Self {
            image,
            replicas: field("replicas").and_then(Value::as_u64).unwrap_or(1),
            namespace: field("namespace")
                .and_then(Value::as_str)
                .unwrap_or("default")
                .to_string(),
        }
    }
}

/// Hints that were present but unusable, so a default took their place.
pub(crate) fn hint_notes(ctx: &ExportContext<'_>) -> Vec<String> {
    let Some(ext) = ctx.manifest.extension(TARGET_NAME) else {
        return Vec::new();
    };
    let mut notes = Vec::new();
    if let Some(replicas) = ext.get("replicas").filter(|v| v.as_u64().is_none()) {
        notes.push(format!(
            "extensions.{}.replicas {} is not a non-negative integer; using 1",
            TARGET_NAME, replicas
        ));
    }
    for key in ["image", "namespace"] {
        if let Some(value) = ext.get(key).filter(|v| !v.is_string()) {
            notes.push(format!(
                "extensions.{}.{} {} is not a string; using the default",
                TARGET_NAME, key, value
            ));
        }
    }
    notes
}

/// Labels stamped on every resource and used as the workload selector.
pub(crate) fn labels(ctx: &ExportContext<'_>) -> Value {
    json!({
        "app.kubernetes.io/name": ctx.name(),
        "app.kubernetes.io/component": ctx.kind().as_str().to_ascii_lowercase(),
        "app.kubernetes.io/managed-by": "agentspec",
    })
}

pub(crate) fn object_meta(ctx: &ExportContext<'_>, name: &str) -> Value {
    let hints = Hints::from_context(ctx);
    json!({
        "name": name,
        "namespace": hints.namespace,
        "labels": labels(ctx),
    })
}

/// Names of the resource files produced for a kind, in kustomization order.
pub(crate) fn resource_files(kind: ManifestKind) -> &'static [&'static str] {
    match kind {
        ManifestKind::Task => &["configmap.yaml", "secret.yaml", "job.yaml"],
        _ => &["configmap.yaml", "secret.yaml", "deployment.yaml", "service.yaml"],
    }
}

pub(crate) fn config_map_name(ctx: &ExportContext<'_>) -> String {
    format!("{}-config", ctx.name())
}

pub(crate) fn secret_name(ctx: &ExportContext<'_>) -> String {
    format!("{}-secrets", ctx.name())
}

pub(crate) fn path(file: &str) -> String {
    format!("{}/{}", RESOURCE_DIR, file)
}

pub struct KubernetesExporter {
    target: ExportTarget,
    generators: Vec<Box<dyn Generator>>,
}

impl KubernetesExporter {
    pub fn new() -> Self {
        Self {
            target: ExportTarget {
                name: TARGET_NAME,
                description: "Kubernetes resources with a kustomization",
                kinds: &[ManifestKind::Agent, ManifestKind::Task],
                format_version: Version::new(1, 0, 0),
                schema_version: Version::new(0, 4, 0),
                test_profile: TestProfile::Resources,
            },
            generators: vec![
                Box::new(configmap::ConfigGenerator),
                Box::new(workload::WorkloadGenerator),
                Box::new(kustomization::KustomizationGenerator),
                Box::new(interface::InterfaceGenerator),
            ],
        }
    }
}

impl Default for KubernetesExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for KubernetesExporter {
    fn target(&self) -> &ExportTarget {
        &self.target
    }

    fn policy(&self, feature: &Feature) -> FeaturePolicy {
        match feature {
            Feature::Tool(tool_type) if tool_type == "code_interpreter" => FeaturePolicy::Reject,
            Feature::Tool(tool_type) if tool_type == "retrieval" => FeaturePolicy::Degrade,
            _ => FeaturePolicy::Supported,
        }
    }

    fn generators(&self) -> &[Box<dyn Generator>] {
        &self.generators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportArtifact, ExportOptions, ExportResult, WARNINGS_FILE};
    use crate::manifest::Manifest;
    use serde_json::json;

    fn agent(tools: Value) -> Manifest {
        Manifest::from_value(json!({
            "apiVersion": "agentspec/v0.4.0",
            "kind": "Agent",
            "metadata": {"name": "support-bot", "version": "1.2.0"},
            "spec": {
                "role": "You answer questions.",
                "llm": {"provider": "anthropic", "model": "claude-sonnet-4"},
                "tools": tools,
                "policies": {"limits": {"maxTurns": 8, "timeoutSeconds": 60}}
            },
            "extensions": {"kubernetes": {"image": "registry.example.com/support:1.2.0", "replicas": 3, "namespace": "agents"}}
        }))
        .unwrap()
    }

    fn exported(manifest: &Manifest) -> Vec<ExportArtifact> {
        match KubernetesExporter::new().export(manifest, &ExportOptions::default()).unwrap() {
            ExportResult::Exported(artifacts) => artifacts,
            ExportResult::Rejected(rejection) => panic!("unexpected rejection: {}", rejection),
        }
    }

    fn yaml(artifacts: &[ExportArtifact], path: &str) -> serde_yaml::Value {
        let artifact = artifacts.iter().find(|a| a.path == path).unwrap();
        serde_yaml::from_str(&artifact.content).unwrap()
    }

    #[test]
    fn test_code_interpreter_rejected_naming_tool() {
        let manifest = agent(json!([
            {"type": "http", "name": "lookup", "endpoint": "https://api.example.com"},
            {"type": "code_interpreter", "name": "run_python"}
        ]));
        let result = KubernetesExporter::new().export(&manifest, &ExportOptions::default()).unwrap();
        let ExportResult::Rejected(rejection) = result else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.target, "kubernetes");
        assert_eq!(rejection.feature.as_deref(), Some("tool:code_interpreter"));
        assert!(rejection.to_string().contains("run_python"));
    }

    #[test]
    fn test_policy_override_turns_rejection_into_degradation() {
        let manifest = agent(json!([{"type": "code_interpreter", "name": "run_python"}]));
        let mut options = ExportOptions::default();
        options
            .policy_overrides
            .insert("tool:code_interpreter".to_string(), FeaturePolicy::Degrade);
        let result = KubernetesExporter::new().export(&manifest, &options).unwrap();
        let ExportResult::Exported(artifacts) = result else {
            panic!("expected export");
        };
        assert!(artifacts.iter().any(|a| a.path == WARNINGS_FILE));
    }

    #[test]
    fn test_agent_resources() {
        let artifacts = exported(&agent(json!([{"type": "retrieval", "name": "docs"}])));
        let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "EXPORT_WARNINGS.md",
                "k8s/configmap.yaml",
                "k8s/deployment.yaml",
                "k8s/interface.json",
                "k8s/kustomization.yaml",
                "k8s/secret.yaml",
                "k8s/service.yaml",
                "export-metadata.json",
            ]
        );

        let deployment = yaml(&artifacts, "k8s/deployment.yaml");
        assert_eq!(deployment["spec"]["replicas"], serde_yaml::Value::from(3));
        assert_eq!(deployment["metadata"]["namespace"], serde_yaml::Value::from("agents"));
        let container = &deployment["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], serde_yaml::Value::from("registry.example.com/support:1.2.0"));
        assert_eq!(container["readinessProbe"]["httpGet"]["path"], serde_yaml::Value::from("/ready"));

        let secret = yaml(&artifacts, "k8s/secret.yaml");
        assert_eq!(secret["stringData"]["ANTHROPIC_API_KEY"], serde_yaml::Value::from(""));

        let configmap = yaml(&artifacts, "k8s/configmap.yaml");
        assert_eq!(configmap["data"]["AGENT_MAX_TURNS"], serde_yaml::Value::from("8"));
        assert_eq!(configmap["data"]["AGENT_TOOLS"], serde_yaml::Value::from("[]"));
    }

    #[test]
    fn test_unusable_replicas_hint_is_noted() {
        let mut document = agent(json!([])).document().clone();
        document["extensions"]["kubernetes"]["replicas"] = json!(-2);
        let artifacts = exported(&Manifest::from_value(document).unwrap());

        let deployment = yaml(&artifacts, "k8s/deployment.yaml");
        assert_eq!(deployment["spec"]["replicas"], serde_yaml::Value::from(1));
        let warnings = artifacts.iter().find(|a| a.path == WARNINGS_FILE).unwrap();
        assert!(warnings.content.contains("extensions.kubernetes.replicas -2 is not a non-negative integer"));
    }

    #[test]
    fn test_valid_hints_leave_no_warnings() {
        let artifacts = exported(&agent(json!([])));
        assert!(artifacts.iter().all(|a| a.path != WARNINGS_FILE));
    }

    #[test]
    fn test_task_becomes_job() {
        let manifest = Manifest::from_value(json!({
            "apiVersion": "agentspec/v0.4.0",
            "kind": "Task",
            "metadata": {"name": "nightly-report"},
            "spec": {
                "steps": [{"name": "collect", "action": "fetch"}],
                "timeoutSeconds": 900,
                "retryPolicy": {"maxAttempts": 3}
            }
        }))
        .unwrap();
        let artifacts = exported(&manifest);
        assert!(artifacts.iter().all(|a| a.path != "k8s/deployment.yaml"));
        let job = yaml(&artifacts, "k8s/job.yaml");
        assert_eq!(job["kind"], serde_yaml::Value::from("Job"));
        assert_eq!(job["spec"]["backoffLimit"], serde_yaml::Value::from(2));
        assert_eq!(job["spec"]["activeDeadlineSeconds"], serde_yaml::Value::from(900));

        let kustomization = yaml(&artifacts, "k8s/kustomization.yaml");
        assert_eq!(
            kustomization["resources"],
            serde_yaml::to_value(["configmap.yaml", "secret.yaml", "job.yaml"]).unwrap()
        );
    }
}
