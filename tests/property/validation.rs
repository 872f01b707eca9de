//! Validator properties

use super::strategies::{agent, broken_agent, manifest, provider_typo};
use agentspec::validator::{validate, ErrorKind, ValidationMode};
use agentspec::SchemaRegistry;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_agents_are_valid(document in agent()) {
        let registry = SchemaRegistry::builtin().unwrap();
        let result = validate(&manifest(document), registry.latest(), ValidationMode::Progressive);
        prop_assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn validation_is_deterministic(document in broken_agent()) {
        let registry = SchemaRegistry::builtin().unwrap();
        let manifest = manifest(document);
        let first = validate(&manifest, registry.latest(), ValidationMode::Progressive);
        let second = validate(&manifest, registry.latest(), ValidationMode::Progressive);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn progressive_contains_fail_fast(document in broken_agent()) {
        let registry = SchemaRegistry::builtin().unwrap();
        let manifest = manifest(document);
        let fail_fast = validate(&manifest, registry.latest(), ValidationMode::FailFast);
        let progressive = validate(&manifest, registry.latest(), ValidationMode::Progressive);

        prop_assert!(!progressive.is_valid());
        prop_assert_eq!(fail_fast.is_valid(), progressive.is_valid());
        prop_assert_eq!(fail_fast.errors().len(), 1);
        prop_assert!(progressive.errors().contains(&fail_fast.errors()[0]));
    }

    #[test]
    fn suggestion_fixes_the_value(document in agent(), typo in provider_typo()) {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut document = document;
        document["spec"]["llm"]["provider"] = json!(typo);

        let result = validate(&manifest(document.clone()), registry.latest(), ValidationMode::Progressive);
        prop_assert_eq!(result.errors().len(), 1);
        let error = &result.errors()[0];
        prop_assert_eq!(error.kind, ErrorKind::EnumViolation);
        prop_assert_eq!(error.path.to_string(), "spec.llm.provider");

        if let Some(suggestion) = &error.suggestion {
            document["spec"]["llm"]["provider"] = json!(suggestion);
            let fixed = validate(&manifest(document), registry.latest(), ValidationMode::Progressive);
            prop_assert!(fixed.is_valid(), "{:?}", fixed.errors());
        }
    }
}
