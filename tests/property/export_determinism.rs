//! Export properties

use super::strategies::{agent, manifest};
use agentspec::export::{ExportOptions, ExportResult, ExporterRegistry};
use agentspec::pipeline::{ExitStatus, Pipeline, TargetStatus};
use agentspec::testgen::TestSelection;
use proptest::prelude::*;

fn options() -> ExportOptions {
    ExportOptions {
        tests: Some(TestSelection::all()),
        ..ExportOptions::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn exporters_are_byte_identical_across_runs(document in agent()) {
        let manifest = manifest(document);
        let options = options();
        for exporter in ExporterRegistry::builtin().iter() {
            let first = exporter.export(&manifest, &options).unwrap();
            let second = exporter.export(&manifest, &options).unwrap();
            prop_assert!(matches!(first, ExportResult::Exported(_)), "{}", exporter.target().name);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn artifact_paths_are_unique_and_relative(document in agent()) {
        let report = Pipeline::builtin()
            .unwrap()
            .export_manifest(&manifest(document), &[], &options())
            .unwrap();
        prop_assert_eq!(report.exit_status(), ExitStatus::Success);

        for outcome in &report.targets {
            let TargetStatus::Exported { artifacts, .. } = &outcome.status else {
                return Err(TestCaseError::fail(format!("{} did not export", outcome.target)));
            };
            let mut paths: Vec<_> = artifacts.iter().map(|a| a.path.clone()).collect();
            prop_assert!(paths.iter().all(|p| p.is_relative() && p.starts_with(&outcome.target)));
            paths.sort();
            paths.dedup();
            prop_assert_eq!(paths.len(), artifacts.len());
        }
    }
}
