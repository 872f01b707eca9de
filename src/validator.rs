//! Validator
//!
//! Checks a manifest against one explicit schema version. Results are data, not Rust
//! errors: a manifest is either `Valid` or `Invalid` with a deterministic list of
//! located errors. The walk never fails and never panics on adversarial input; nesting
//! beyond `max_depth` is reported instead of descended.

mod advisories;
mod errors;
mod suggest;
mod walk;

pub use advisories::{advisories, Advisory};
pub use errors::{ErrorKind, ValidationError};
pub use suggest::levenshtein;

use crate::manifest::{FieldPath, Manifest};
use crate::schema::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use walk::Walker;

/// Default nesting limit for manifest documents.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Stop at the first error of the walk.
    FailFast,
    /// Report every error.
    #[default]
    Progressive,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::FailFast => "fail-fast",
            ValidationMode::Progressive => "progressive",
        }
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" | "failfast" => Ok(ValidationMode::FailFast),
            "progressive" => Ok(ValidationMode::Progressive),
            other => Err(format!(
                "unknown validation mode '{}' (expected 'fail-fast' or 'progressive')",
                other
            )),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid(Manifest),
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    pub fn into_manifest(self) -> Option<Manifest> {
        match self {
            ValidationResult::Valid(manifest) => Some(manifest),
            ValidationResult::Invalid(_) => None,
        }
    }
}

/// Schema validator with a configurable depth cap.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_depth: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Validator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn validate(
        &self,
        manifest: &Manifest,
        schema: &SchemaVersion,
        mode: ValidationMode,
    ) -> ValidationResult {
        let mut walker = Walker::new(mode, self.max_depth);
        walker.node(schema.root(), manifest.document(), &FieldPath::root());
        let errors = walker.finish();

        debug!(
            manifest = manifest.name().unwrap_or("<unnamed>"),
            schema_version = %schema.version(),
            mode = mode.as_str(),
            errors = errors.len(),
            "Validated manifest"
        );

        if errors.is_empty() {
            ValidationResult::Valid(manifest.clone())
        } else {
            ValidationResult::Invalid(errors)
        }
    }
}

/// Validate with the default depth cap.
pub fn validate(
    manifest: &Manifest,
    schema: &SchemaVersion,
    mode: ValidationMode,
) -> ValidationResult {
    Validator::default().validate(manifest, schema, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_str;
    use crate::schema::SchemaRegistry;
    use serde_json::json;

    const VALID_AGENT: &str = r#"
apiVersion: agentspec/v0.4.0
kind: Agent
metadata:
  name: support-bot
  description: Answers support tickets
spec:
  role: You answer customer support questions.
  llm:
    provider: anthropic
    model: claude-sonnet-4
    temperature: 0.3
  tools:
    - type: http
      name: lookup_order
      endpoint: https://orders.internal/api
      method: GET
"#;

    fn manifest(yaml: &str) -> Manifest {
        parse_str(yaml, None).unwrap()
    }

    fn check(yaml: &str, mode: ValidationMode) -> ValidationResult {
        let registry = SchemaRegistry::builtin().unwrap();
        validate(&manifest(yaml), registry.latest(), mode)
    }

    #[test]
    fn test_valid_agent() {
        assert!(check(VALID_AGENT, ValidationMode::Progressive).is_valid());
    }

    #[test]
    fn test_missing_role_is_one_error() {
        let yaml = VALID_AGENT.replace("  role: You answer customer support questions.\n", "");
        let result = check(&yaml, ValidationMode::Progressive);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "spec.role");
        assert_eq!(errors[0].kind, ErrorKind::MissingRequired);
    }

    #[test]
    fn test_provider_alias_suggestion() {
        let yaml = VALID_AGENT.replace("provider: anthropic", "provider: claude");
        let result = check(&yaml, ValidationMode::Progressive);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "spec.llm.provider");
        assert_eq!(errors[0].kind, ErrorKind::EnumViolation);
        assert_eq!(errors[0].suggestion.as_deref(), Some("anthropic"));
        assert_eq!(errors[0].actual, Some(json!("claude")));
    }

    #[test]
    fn test_unknown_field_suggestion() {
        let yaml = VALID_AGENT.replace("temperature: 0.3", "temprature: 0.3");
        let result = check(&yaml, ValidationMode::Progressive);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_string(), "spec.llm.temprature");
        assert_eq!(errors[0].kind, ErrorKind::UnknownField);
        assert_eq!(errors[0].suggestion.as_deref(), Some("temperature"));
    }

    #[test]
    fn test_progressive_reports_everything_fail_fast_reports_first() {
        let yaml = VALID_AGENT
            .replace("provider: anthropic", "provider: claude")
            .replace("temperature: 0.3", "temperature: 5")
            .replace("method: GET", "method: FETCH");
        let progressive = check(&yaml, ValidationMode::Progressive);
        let fail_fast = check(&yaml, ValidationMode::FailFast);

        let paths: Vec<String> = progressive.errors().iter().map(|e| e.path.to_string()).collect();
        assert_eq!(
            paths,
            vec!["spec.llm.provider", "spec.llm.temperature", "spec.tools[0].method"]
        );
        assert_eq!(fail_fast.errors(), &progressive.errors()[..1]);
    }

    #[test]
    fn test_type_mismatch_reports_found_type() {
        let yaml = VALID_AGENT.replace("temperature: 0.3", "temperature: warm");
        let result = check(&yaml, ValidationMode::Progressive);
        assert_eq!(result.errors()[0].kind, ErrorKind::TypeMismatch);
        assert!(result.errors()[0].message.contains("expected number, found string"));
    }

    #[test]
    fn test_pattern_violation_carries_value() {
        let yaml = VALID_AGENT.replace("name: lookup_order", "name: lookup order");
        let result = check(&yaml, ValidationMode::Progressive);
        let err = &result.errors()[0];
        assert_eq!(err.kind, ErrorKind::PatternViolation);
        assert!(err.message.contains("lookup order"));
    }

    #[test]
    fn test_depth_cap_in_free_form_subtree() {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut deep = json!("leaf");
        for _ in 0..40 {
            deep = json!({ "n": deep });
        }
        let mut doc = manifest(VALID_AGENT).into_document();
        doc["extensions"] = json!({ "custom": deep });
        let manifest = Manifest::from_value(doc).unwrap();

        let result = Validator::new(8).validate(&manifest, registry.latest(), ValidationMode::Progressive);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::StructureTooDeep);
        assert_eq!(errors[0].path.depth(), 9);
    }

    #[test]
    fn test_task_spec_selected_by_kind() {
        let yaml = r#"
apiVersion: agentspec/v0.4.0
kind: Task
metadata:
  name: nightly-report
spec:
  steps: []
"#;
        let result = check(yaml, ValidationMode::Progressive);
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].kind, ErrorKind::RangeViolation);
        assert_eq!(result.errors()[0].path.to_string(), "spec.steps");
    }

    #[test]
    fn test_wrong_api_version_for_schema() {
        let yaml = VALID_AGENT.replace("agentspec/v0.4.0", "agentspec/v0.3.0");
        let result = check(&yaml, ValidationMode::Progressive);
        assert_eq!(result.errors()[0].path.to_string(), "apiVersion");
        assert_eq!(result.errors()[0].kind, ErrorKind::PatternViolation);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("fail-fast".parse::<ValidationMode>().unwrap(), ValidationMode::FailFast);
        assert_eq!("fail_fast".parse::<ValidationMode>().unwrap(), ValidationMode::FailFast);
        assert!("strict".parse::<ValidationMode>().is_err());
    }
}
