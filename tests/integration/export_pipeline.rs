//! Exporting through the pipeline to disk

use super::test_utils::{manifest, write_manifest, LEGACY_AGENT, NIGHTLY_TASK, SUPPORT_AGENT};
use agentspec::error::PipelineError;
use agentspec::export::{
    ArtifactKind, ExportArtifact, ExportContext, ExportOptions, ExportTarget, Exporter, Feature,
    FeaturePolicy, Generator, METADATA_FILE,
};
use agentspec::manifest::ManifestKind;
use agentspec::pipeline::{ExitStatus, Pipeline, TargetStatus};
use agentspec::testgen::{TestProfile, TestSelection};
use semver::Version;
use std::sync::Arc;
use tempfile::TempDir;

fn exported_files(status: &TargetStatus) -> Vec<String> {
    match status {
        TargetStatus::Exported { out_dir, artifacts, .. } => artifacts
            .iter()
            .map(|a| {
                a.path
                    .strip_prefix(dunce::canonicalize(out_dir).unwrap())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect(),
        other => panic!("expected export, got {:?}", other),
    }
}

#[test]
fn test_export_path_writes_every_target() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_manifest(temp_dir.path(), "support.yaml", SUPPORT_AGENT);
    let out_dir = temp_dir.path().join("dist");
    let options = ExportOptions {
        tests: Some(TestSelection::all()),
        ..ExportOptions::default()
    };

    let report = Pipeline::builtin()
        .unwrap()
        .export_path(&source, &[], &out_dir, &options)
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::Success);
    let targets: Vec<&str> = report.targets.iter().map(|t| t.target.as_str()).collect();
    assert_eq!(targets, vec!["kubernetes", "langchain"]);

    let langchain = exported_files(&report.targets[1].status);
    for expected in ["agent.py", "server.py", "tests/conftest.py", "tests/test_resource_policy.py", METADATA_FILE] {
        assert!(langchain.iter().any(|p| p == expected), "missing {expected} in {langchain:?}");
        assert!(out_dir.join("langchain").join(expected).is_file());
    }

    let kubernetes = exported_files(&report.targets[0].status);
    assert!(kubernetes.iter().any(|p| p == "k8s/deployment.yaml"));
    assert!(kubernetes.iter().any(|p| p == "tests/test_safety.py"));
}

#[test]
fn test_legacy_manifest_is_migrated_before_export() {
    let report = Pipeline::builtin()
        .unwrap()
        .export_manifest(&manifest(LEGACY_AGENT), &["langchain".to_string()], &ExportOptions::default())
        .unwrap();

    assert_eq!(report.schema_version, "0.2.0");
    let TargetStatus::Exported { deprecations, .. } = &report.targets[0].status else {
        panic!("expected export, got {:?}", report.targets[0].status);
    };
    assert!(!deprecations.is_empty());
}

#[test]
fn test_invalid_manifest_exports_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = SUPPORT_AGENT.replace("model: claude-sonnet-4", "model: 42");
    let source = write_manifest(temp_dir.path(), "broken.yaml", &yaml);
    let out_dir = temp_dir.path().join("dist");

    let report = Pipeline::builtin()
        .unwrap()
        .export_path(&source, &["langchain".to_string()], &out_dir, &ExportOptions::default())
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::ValidationFailed);
    assert!(report.targets.is_empty());
    assert!(!out_dir.exists());
}

#[test]
fn test_task_goes_to_kubernetes_only() {
    let report = Pipeline::builtin()
        .unwrap()
        .export_manifest(
            &manifest(NIGHTLY_TASK),
            &["kubernetes".to_string(), "langchain".to_string()],
            &ExportOptions::default(),
        )
        .unwrap();

    assert!(matches!(report.targets[0].status, TargetStatus::Exported { .. }));
    assert!(matches!(report.targets[1].status, TargetStatus::Rejected { .. }));
    assert_eq!(report.exit_status(), ExitStatus::ExportRejected);
}

struct EscapingGenerator;

impl Generator for EscapingGenerator {
    fn name(&self) -> &'static str {
        "escaping"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        Ok(vec![ExportArtifact::new(
            "../outside.txt",
            ArtifactKind::Source,
            ctx.name().to_string(),
        )])
    }
}

struct EscapingExporter {
    target: ExportTarget,
    generators: Vec<Box<dyn Generator>>,
}

impl EscapingExporter {
    fn new() -> Self {
        Self {
            target: ExportTarget {
                name: "escaping",
                description: "writes outside its directory",
                kinds: &[ManifestKind::Agent],
                format_version: Version::new(0, 1, 0),
                schema_version: Version::new(0, 4, 0),
                test_profile: TestProfile::Application,
            },
            generators: vec![Box::new(EscapingGenerator)],
        }
    }
}

impl Exporter for EscapingExporter {
    fn target(&self) -> &ExportTarget {
        &self.target
    }

    fn policy(&self, _feature: &Feature) -> FeaturePolicy {
        FeaturePolicy::Supported
    }

    fn generators(&self) -> &[Box<dyn Generator>] {
        &self.generators
    }
}

#[test]
fn test_unsafe_artifact_fails_only_its_target() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_manifest(temp_dir.path(), "support.yaml", SUPPORT_AGENT);
    let out_dir = temp_dir.path().join("dist");
    let pipeline = Pipeline::builtin()
        .unwrap()
        .with_exporter(Arc::new(EscapingExporter::new()));

    let report = pipeline
        .export_path(
            &source,
            &["escaping".to_string(), "langchain".to_string()],
            &out_dir,
            &ExportOptions::default(),
        )
        .unwrap();

    let TargetStatus::Failed { message, .. } = &report.targets[0].status else {
        panic!("expected failure, got {:?}", report.targets[0].status);
    };
    assert!(message.contains("../outside.txt"));
    assert!(matches!(report.targets[1].status, TargetStatus::Exported { .. }));
    assert_eq!(report.exit_status(), ExitStatus::Failure);
    assert!(!out_dir.join("outside.txt").exists());
    assert!(!out_dir.join("escaping").exists());
}
