//! Agent Manifests
//!
//! A manifest is held as an untyped document tree so that unknown or misspelled fields
//! survive until the validator can report them. Typed views (`AgentSpec`, `TaskSpec`,
//! `WorkflowSpec`) are derived on demand for exporters, which only ever see manifests
//! that already passed validation.
//!
//! Manifests are immutable pipeline input: every transformation builds a new value.

mod model;
mod parse;
mod path;

pub use model::{
    AgentSpec, Autonomy, Budget, FallbackModel, Limits, LlmConfig, Metadata, PiiDetection,
    Policies, Provider, RateLimits, RetryPolicy, Safety, StatePolicy, StateStrategy, TaskSpec,
    TaskStep, ToolSpec, ToolType, WorkflowSpec, WorkflowStep,
};
pub use parse::{load, parse_str, ManifestFormat};
pub use path::{lookup, FieldPath};

use crate::error::ParseError;
use semver::Version;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Prefix of the `apiVersion` field: `agentspec/v0.4.0`.
pub const API_VERSION_PREFIX: &str = "agentspec/v";

/// Render the `apiVersion` string for a schema version.
pub fn api_version_for(version: &Version) -> String {
    format!("{}{}", API_VERSION_PREFIX, version)
}

/// Parse a schema version out of an `apiVersion` string.
pub fn parse_api_version(api_version: &str) -> Option<Version> {
    let raw = api_version.strip_prefix(API_VERSION_PREFIX)?;
    Version::parse(raw).ok()
}

/// Manifest kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ManifestKind {
    Agent,
    Task,
    Workflow,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 3] = [ManifestKind::Agent, ManifestKind::Task, ManifestKind::Workflow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Agent => "Agent",
            ManifestKind::Task => "Task",
            ManifestKind::Workflow => "Workflow",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent manifest document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    document: Value,
}

impl Manifest {
    /// Wrap a parsed document. The top level must be a mapping.
    pub fn from_value(document: Value) -> Result<Self, ParseError> {
        match &document {
            Value::Object(_) => Ok(Self { document }),
            other => Err(ParseError::NotAMapping(value_type_name(other))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            document: Value::Object(map),
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// Look up a dotted path such as `spec.llm.provider` or `spec.tools[0].name`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.document, path)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.document.get("apiVersion").and_then(Value::as_str)
    }

    /// Schema version declared by `apiVersion`, when it is well formed.
    pub fn schema_version(&self) -> Option<Version> {
        self.api_version().and_then(parse_api_version)
    }

    pub fn kind(&self) -> Option<ManifestKind> {
        self.document
            .get("kind")
            .and_then(Value::as_str)
            .and_then(ManifestKind::parse)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("metadata.name").and_then(Value::as_str)
    }

    /// Human-readable label for logs and reports.
    pub fn display_name(&self) -> String {
        self.name().unwrap_or("<unnamed>").to_string()
    }

    pub fn metadata(&self) -> Result<Metadata, serde_json::Error> {
        typed_view(self.document.get("metadata"))
    }

    pub fn agent_spec(&self) -> Result<AgentSpec, serde_json::Error> {
        typed_view(self.document.get("spec"))
    }

    pub fn task_spec(&self) -> Result<TaskSpec, serde_json::Error> {
        typed_view(self.document.get("spec"))
    }

    pub fn workflow_spec(&self) -> Result<WorkflowSpec, serde_json::Error> {
        typed_view(self.document.get("spec"))
    }

    /// Per-target hints under `extensions.<target>`.
    pub fn extension(&self, target: &str) -> Option<&Value> {
        self.document.get("extensions").and_then(|ext| ext.get(target))
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.document)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

fn typed_view<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(value.cloned().unwrap_or(Value::Null))
}

/// JSON-style type name used in diagnostics.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_mapping_document() {
        let err = Manifest::from_value(json!(["a"])).unwrap_err();
        assert!(matches!(err, ParseError::NotAMapping("array")));
    }

    #[test]
    fn test_schema_version_from_api_version() {
        let manifest = Manifest::from_value(json!({"apiVersion": "agentspec/v0.3.0"})).unwrap();
        assert_eq!(manifest.schema_version(), Some(Version::new(0, 3, 0)));

        let manifest = Manifest::from_value(json!({"apiVersion": "v0.3.0"})).unwrap();
        assert_eq!(manifest.schema_version(), None);
    }

    #[test]
    fn test_kind_and_name_accessors() {
        let manifest = Manifest::from_value(json!({
            "kind": "Task",
            "metadata": {"name": "nightly-report"}
        }))
        .unwrap();
        assert_eq!(manifest.kind(), Some(ManifestKind::Task));
        assert_eq!(manifest.name(), Some("nightly-report"));
        assert_eq!(manifest.display_name(), "nightly-report");
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(value_type_name(&json!(1)), "integer");
        assert_eq!(value_type_name(&json!(1.5)), "number");
        assert_eq!(value_type_name(&json!(null)), "null");
    }
}
