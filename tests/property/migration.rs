//! Migration properties

use super::strategies::{agent, manifest};
use agentspec::pipeline::{MigrateStatus, Pipeline};
use agentspec::validator::{validate, ValidationMode};
use agentspec::{SchemaRegistry, VersionSelector};
use proptest::prelude::*;

const VERSIONS: &[&str] = &["0.2.0", "0.3.0", "0.4.0"];

fn selector(raw: &str) -> VersionSelector {
    raw.parse().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn downgrade_and_upgrade_is_lossless(document in agent()) {
        let pipeline = Pipeline::builtin().unwrap();
        let original = manifest(document);

        let down = pipeline.migrate_manifest(&original, &selector("0.3.0")).unwrap();
        prop_assert!(matches!(down.status, MigrateStatus::Migrated { .. }), "{:?}", down.status);
        let down = down.migrated.unwrap();
        prop_assert_eq!(down.api_version(), Some("agentspec/v0.3.0"));

        let up = pipeline.migrate_manifest(&down, &selector("0.4.0")).unwrap();
        prop_assert!(matches!(up.status, MigrateStatus::Migrated { .. }), "{:?}", up.status);
        prop_assert_eq!(up.migrated.unwrap(), original);
    }

    #[test]
    fn legacy_round_trip_through_v03_is_lossless(document in agent()) {
        let pipeline = Pipeline::builtin().unwrap();
        let legacy = pipeline.migrate_manifest(&manifest(document), &selector("0.2.0")).unwrap();
        prop_assert!(matches!(legacy.status, MigrateStatus::Migrated { .. }), "{:?}", legacy.status);
        let legacy = legacy.migrated.unwrap();

        let up = pipeline.migrate_manifest(&legacy, &selector("0.3.0")).unwrap();
        prop_assert!(matches!(up.status, MigrateStatus::Migrated { .. }), "{:?}", up.status);
        let up = up.migrated.unwrap();
        prop_assert_eq!(up.api_version(), Some("agentspec/v0.3.0"));

        let down = pipeline.migrate_manifest(&up, &selector("0.2.0")).unwrap();
        prop_assert!(matches!(down.status, MigrateStatus::Migrated { .. }), "{:?}", down.status);
        prop_assert_eq!(down.migrated.unwrap(), legacy);
    }

    #[test]
    fn every_version_validates_after_migration(
        document in agent(),
        target in prop::sample::select(VERSIONS),
    ) {
        let pipeline = Pipeline::builtin().unwrap();
        let registry = SchemaRegistry::builtin().unwrap();
        let report = pipeline.migrate_manifest(&manifest(document), &selector(target)).unwrap();

        let MigrateStatus::Migrated { .. } = &report.status else {
            return Err(TestCaseError::fail(format!("{:?}", report.status)));
        };
        let migrated = report.migrated.unwrap();
        let schema = registry.resolve(&selector(target)).unwrap();
        let result = validate(&migrated, schema, ValidationMode::Progressive);
        prop_assert!(result.is_valid(), "{:?}", result.errors());
    }
}
