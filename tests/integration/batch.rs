//! Batch runs over directories of manifests

use super::test_utils::{write_manifest, LEGACY_AGENT, NIGHTLY_TASK, SUPPORT_AGENT};
use agentspec::export::ExportOptions;
use agentspec::pipeline::{
    discover, BatchOperation, BatchOutcome, BatchRunner, ExitStatus, Pipeline,
};
use agentspec::VersionSelector;
use std::sync::Arc;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), "agents/support.yaml", SUPPORT_AGENT);
    write_manifest(temp_dir.path(), "agents/legacy.yaml", LEGACY_AGENT);
    write_manifest(temp_dir.path(), "tasks/nightly.yaml", NIGHTLY_TASK);
    write_manifest(
        temp_dir.path(),
        "agents/broken.yaml",
        &SUPPORT_AGENT.replace("provider: anthropic", "provider: claude"),
    );
    write_manifest(temp_dir.path(), "agents/notes.txt", "not a manifest");
    temp_dir
}

fn file_names(report: &agentspec::pipeline::BatchReport) -> Vec<String> {
    report
        .items
        .iter()
        .map(|item| item.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_validate_keeps_input_order() {
    let temp_dir = workspace();
    let paths = discover(temp_dir.path()).unwrap();
    let runner = BatchRunner::new(Arc::new(Pipeline::builtin().unwrap())).with_concurrency(2);

    let report = runner
        .run(paths, BatchOperation::Validate { selector: None, mode: None })
        .await
        .unwrap();

    assert_eq!(
        file_names(&report),
        vec!["broken.yaml", "legacy.yaml", "support.yaml", "nightly.yaml"]
    );
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.exit_status(), ExitStatus::ValidationFailed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_failure_does_not_stop_others() {
    let temp_dir = workspace();
    let missing = temp_dir.path().join("agents/missing.yaml");
    let paths = vec![
        missing,
        temp_dir.path().join("agents/support.yaml"),
    ];
    let runner = BatchRunner::new(Arc::new(Pipeline::builtin().unwrap()));

    let report = runner
        .run(paths, BatchOperation::Validate { selector: None, mode: None })
        .await
        .unwrap();

    assert!(matches!(report.items[0].outcome, BatchOutcome::Failed { .. }));
    assert_eq!(report.items[1].outcome.exit_status(), ExitStatus::Success);
    assert_eq!(report.exit_status(), ExitStatus::Failure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_migrate_writes_each_file() {
    let temp_dir = workspace();
    let out_dir = temp_dir.path().join("migrated");
    let paths = vec![
        temp_dir.path().join("agents/legacy.yaml"),
        temp_dir.path().join("agents/support.yaml"),
    ];
    let runner = BatchRunner::new(Arc::new(Pipeline::builtin().unwrap()));

    let report = runner
        .run(
            paths,
            BatchOperation::Migrate {
                to: VersionSelector::Latest,
                output_dir: Some(out_dir.clone()),
            },
        )
        .await
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert!(out_dir.join("legacy.yaml").is_file());
    assert!(out_dir.join("support.yaml").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_export_separates_manifests() {
    let temp_dir = workspace();
    let out_dir = temp_dir.path().join("dist");
    let paths = vec![
        temp_dir.path().join("agents/support.yaml"),
        temp_dir.path().join("tasks/nightly.yaml"),
    ];
    let runner = BatchRunner::new(Arc::new(Pipeline::builtin().unwrap())).with_concurrency(1);

    let report = runner
        .run(
            paths,
            BatchOperation::Export {
                targets: vec!["kubernetes".to_string()],
                out_dir: out_dir.clone(),
                options: ExportOptions::default(),
            },
        )
        .await
        .unwrap();

    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert!(out_dir.join("support/kubernetes/k8s/deployment.yaml").is_file());
    assert!(out_dir.join("nightly/kubernetes/k8s/job.yaml").is_file());
}
