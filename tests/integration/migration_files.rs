//! Migration through the pipeline, reading and writing files

use super::test_utils::{manifest, write_manifest, LEGACY_AGENT, SUPPORT_AGENT};
use agentspec::manifest::load;
use agentspec::migrate::{DeprecationAction, MigrationResult, Migrator};
use agentspec::pipeline::{ExitStatus, MigrateStatus, Pipeline};
use agentspec::{SchemaRegistry, VersionSelector};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_migrate_path_writes_json_when_asked() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_manifest(temp_dir.path(), "legacy.yaml", LEGACY_AGENT);
    let output = temp_dir.path().join("out/legacy.json");

    let report = Pipeline::builtin()
        .unwrap()
        .migrate_path(&source, &VersionSelector::Latest, Some(&output))
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert_eq!(report.output.as_deref(), Some(output.as_path()));
    let raw = std::fs::read_to_string(&output).unwrap();
    let written: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(written["apiVersion"], json!("agentspec/v0.4.0"));
    assert_eq!(written["spec"]["policies"]["limits"]["timeoutSeconds"], json!(30));
}

#[test]
fn test_migrate_path_writes_yaml_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_manifest(temp_dir.path(), "legacy.yml", LEGACY_AGENT);
    let output = temp_dir.path().join("legacy-v04.yaml");

    Pipeline::builtin()
        .unwrap()
        .migrate_path(&source, &"0.3".parse().unwrap(), Some(&output))
        .unwrap();

    let migrated = load(&output).unwrap();
    assert_eq!(migrated.api_version(), Some("agentspec/v0.3.0"));
    assert_eq!(migrated.get("spec.state.window"), Some(&json!(20)));
}

#[test]
fn test_unsupported_migration_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_manifest(temp_dir.path(), "bot.yaml", SUPPORT_AGENT);
    let output = temp_dir.path().join("never.yaml");
    let pipeline = Pipeline::builtin().unwrap();

    let report = pipeline.migrate_path(&source, &"9.0.0".parse().unwrap(), Some(&output));
    let err = report.unwrap_err();
    assert_eq!(ExitStatus::from(&err).code(), 6);
    assert!(!output.exists());
}

#[test]
fn test_empty_graph_reports_unsupported() {
    let registry = SchemaRegistry::builtin().unwrap();
    let result = Migrator::empty().migrate(
        &manifest(LEGACY_AGENT),
        registry.resolve_str("0.2.0").unwrap(),
        registry.latest(),
    );
    assert!(matches!(result, MigrationResult::Unsupported { .. }));
}

#[test]
fn test_downgrade_records_dropped_fields() {
    let yaml = SUPPORT_AGENT.replace(
        "    temperature: 0.2\n",
        "    temperature: 0.2\n    fallbackModels:\n      - provider: openai\n        model: gpt-4o\n",
    );
    let report = Pipeline::builtin()
        .unwrap()
        .migrate_manifest(&manifest(&yaml), &"0.3.0".parse().unwrap())
        .unwrap();

    let MigrateStatus::Migrated { deprecations } = &report.status else {
        panic!("expected downgrade to succeed, got {:?}", report.status);
    };
    assert!(deprecations
        .iter()
        .any(|d| d.action == DeprecationAction::Dropped && d.path == "spec.llm.fallbackModels"));
    let migrated = report.migrated.as_ref().unwrap();
    assert_eq!(migrated.get("spec.safety.maxTurns"), Some(&json!(6)));
    assert_eq!(migrated.get("spec.tools[0].type"), Some(&json!("api")));
}
