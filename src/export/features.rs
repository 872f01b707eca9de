//! Manifest features and per-target handling policies.

use crate::manifest::{lookup, Manifest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A capability a manifest asks of its target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// A tool of the given type (`tool:http`).
    Tool(String),
    State,
    FallbackModels,
    PiiRedaction,
    HumanApproval,
}

impl Feature {
    pub fn tool(tool_type: &str) -> Self {
        Feature::Tool(tool_type.to_string())
    }

    pub fn name(&self) -> String {
        match self {
            Feature::Tool(tool_type) => format!("tool:{}", tool_type),
            Feature::State => "state".to_string(),
            Feature::FallbackModels => "fallback-models".to_string(),
            Feature::PiiRedaction => "pii-redaction".to_string(),
            Feature::HumanApproval => "human-approval".to_string(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(tool_type) = raw.strip_prefix("tool:") {
            return (!tool_type.is_empty()).then(|| Feature::tool(tool_type));
        }
        match raw {
            "state" => Some(Feature::State),
            "fallback-models" => Some(Feature::FallbackModels),
            "pii-redaction" => Some(Feature::PiiRedaction),
            "human-approval" => Some(Feature::HumanApproval),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// How a target treats a feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturePolicy {
    #[default]
    Supported,
    /// Omit the feature and record a warning artifact.
    Degrade,
    /// Refuse the export.
    Reject,
}

impl FromStr for FeaturePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "supported" | "support" => Ok(FeaturePolicy::Supported),
            "degrade" | "degraded" => Ok(FeaturePolicy::Degrade),
            "reject" | "rejected" => Ok(FeaturePolicy::Reject),
            other => Err(format!(
                "unknown feature policy '{}' (expected supported, degrade or reject)",
                other
            )),
        }
    }
}

/// Features used by a manifest, each with the locations that use it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    features: BTreeMap<Feature, Vec<String>>,
}

impl FeatureSet {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let doc = manifest.document();
        let mut set = Self::default();

        if let Some(tools) = lookup(doc, "spec.tools").and_then(Value::as_array) {
            for (idx, tool) in tools.iter().enumerate() {
                if let Some(tool_type) = tool.get("type").and_then(Value::as_str) {
                    let name = tool.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
                    set.add(Feature::tool(tool_type), format!("spec.tools[{}] ({})", idx, name));
                }
            }
        }

        if let Some(state) = lookup(doc, "spec.state") {
            if state.get("enabled").and_then(Value::as_bool) != Some(false) {
                set.add(Feature::State, "spec.state");
            }
        }

        let has_fallbacks = lookup(doc, "spec.llm.fallbackModels")
            .and_then(Value::as_array)
            .is_some_and(|models| !models.is_empty());
        if has_fallbacks {
            set.add(Feature::FallbackModels, "spec.llm.fallbackModels");
        }

        if lookup(doc, "spec.safety.piiDetection.redact").and_then(Value::as_bool) == Some(true) {
            set.add(Feature::PiiRedaction, "spec.safety.piiDetection");
        }

        let needs_approval = lookup(doc, "spec.autonomy.requireApproval")
            .and_then(Value::as_array)
            .is_some_and(|actions| !actions.is_empty());
        if needs_approval {
            set.add(Feature::HumanApproval, "spec.autonomy.requireApproval");
        }

        set
    }

    fn add(&mut self, feature: Feature, origin: impl Into<String>) {
        self.features.entry(feature).or_default().push(origin.into());
    }

    pub fn contains(&self, feature: &Feature) -> bool {
        self.features.contains_key(feature)
    }

    pub fn origins(&self, feature: &Feature) -> &[String] {
        self.features.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Feature, &[String])> {
        self.features.iter().map(|(f, o)| (f, o.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
