//! End-to-end acceptance scenarios

use super::test_utils::{manifest, LEGACY_AGENT, SUPPORT_AGENT};
use agentspec::export::{ExportOptions, ExportResult, Exporter, ExporterRegistry};
use agentspec::pipeline::{ExitStatus, MigrateStatus, Pipeline, TargetStatus};
use agentspec::validator::{ErrorKind, ValidationMode};
use agentspec::{SchemaRegistry, VersionSelector};

#[test]
fn test_missing_role_is_exactly_one_error() {
    let pipeline = Pipeline::builtin().unwrap();
    let yaml = SUPPORT_AGENT.replace("  role: You answer customer support questions.\n", "");
    let report = pipeline
        .validate_manifest(&manifest(&yaml), None, Some(ValidationMode::Progressive))
        .unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path.to_string(), "spec.role");
    assert_eq!(report.errors[0].kind, ErrorKind::MissingRequired);
    assert_eq!(report.exit_status().code(), 3);
}

#[test]
fn test_provider_typo_suggests_closest_value() {
    let pipeline = Pipeline::builtin().unwrap();
    let yaml = SUPPORT_AGENT.replace("provider: anthropic", "provider: claude");
    let report = pipeline.validate_manifest(&manifest(&yaml), None, None).unwrap();

    let error = report
        .errors
        .iter()
        .find(|e| e.path.to_string() == "spec.llm.provider")
        .expect("provider error");
    assert_eq!(error.kind, ErrorKind::EnumViolation);
    assert_eq!(error.suggestion.as_deref(), Some("anthropic"));
    assert!(error.message.contains("claude"));
}

#[test]
fn test_legacy_manifest_migrates_two_steps_and_revalidates() {
    let pipeline = Pipeline::builtin().unwrap();
    let report = pipeline
        .migrate_manifest(&manifest(LEGACY_AGENT), &"0.4.0".parse::<VersionSelector>().unwrap())
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert_eq!(report.from, "0.2.0");
    assert_eq!(report.to, "0.4.0");
    let MigrateStatus::Migrated { deprecations } = &report.status else {
        panic!("expected migration, got {:?}", report.status);
    };
    assert!(deprecations.iter().any(|d| d.to.to_string() == "0.3.0"));
    assert!(deprecations.iter().any(|d| d.to.to_string() == "0.4.0"));

    let migrated = report.migrated.as_ref().unwrap();
    let revalidated = pipeline.validate_manifest(migrated, None, None).unwrap();
    assert!(revalidated.is_valid(), "{:?}", revalidated.errors);
    assert_eq!(revalidated.schema_version, "0.4.0");
}

#[test]
fn test_export_twice_is_identical() {
    let pipeline = Pipeline::builtin().unwrap();
    let manifest = manifest(SUPPORT_AGENT);
    let targets = vec!["langchain".to_string(), "kubernetes".to_string()];
    let options = ExportOptions::default();

    let first = pipeline.export_manifest(&manifest, &targets, &options).unwrap();
    let second = pipeline.export_manifest(&manifest, &targets, &options).unwrap();

    assert_eq!(first.exit_status(), ExitStatus::Success);
    for (a, b) in first.targets.iter().zip(&second.targets) {
        let (TargetStatus::Exported { artifacts: left, .. }, TargetStatus::Exported { artifacts: right, .. }) =
            (&a.status, &b.status)
        else {
            panic!("both exports should succeed");
        };
        let left: Vec<_> = left.iter().map(|w| (&w.path, &w.blake3)).collect();
        let right: Vec<_> = right.iter().map(|w| (&w.path, &w.blake3)).collect();
        assert_eq!(left, right);
    }
}

#[test]
fn test_rejected_tool_type_is_named() {
    let yaml = SUPPORT_AGENT.replace(
        "  state:\n",
        "    - type: code_interpreter\n      name: run_python\n  state:\n",
    );
    let manifest = manifest(&yaml);
    let registry = SchemaRegistry::builtin().unwrap();
    assert!(agentspec::validator::validate(&manifest, registry.latest(), ValidationMode::Progressive).is_valid());

    let exporter = ExporterRegistry::builtin().get("kubernetes").unwrap();
    let ExportResult::Rejected(rejection) = exporter.export(&manifest, &ExportOptions::default()).unwrap() else {
        panic!("kubernetes should reject code_interpreter");
    };
    assert_eq!(rejection.feature.as_deref(), Some("tool:code_interpreter"));
    assert!(rejection.to_string().contains("run_python"));

    let report = Pipeline::builtin()
        .unwrap()
        .export_manifest(&manifest, &["kubernetes".to_string()], &ExportOptions::default())
        .unwrap();
    assert_eq!(report.exit_status().code(), 5);
}
