//! Best-practice notes that never affect validity.

use crate::manifest::{lookup, Manifest, ManifestKind};
use crate::schema::SchemaVersion;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub path: String,
    pub message: String,
}

impl Advisory {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Collect advisories for a manifest read against `schema`.
pub fn advisories(manifest: &Manifest, schema: &SchemaVersion) -> Vec<Advisory> {
    let doc = manifest.document();
    let mut notes = Vec::new();

    let has_description = lookup(doc, "metadata.description")
        .and_then(Value::as_str)
        .is_some_and(|d| !d.trim().is_empty());
    if !has_description {
        notes.push(Advisory::new(
            "metadata.description",
            "add a description so generated services and docs can explain the agent",
        ));
    }

    if manifest.kind() == Some(ManifestKind::Agent) {
        let tool_count = lookup(doc, "spec.tools")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if tool_count == 0 {
            notes.push(Advisory::new("spec.tools", "agent declares no tools"));
        }

        let has_budget = lookup(doc, "spec.policies.budget").is_some()
            || lookup(doc, "spec.constraints.cost").is_some();
        if !has_budget {
            notes.push(Advisory::new(
                "spec.policies.budget",
                "no budget policy; token spend is unbounded",
            ));
        }

        let temperature = lookup(doc, "spec.llm.temperature").and_then(Value::as_f64);
        if let Some(t) = temperature.filter(|t| *t > 1.0 && tool_count > 0) {
            notes.push(Advisory::new(
                "spec.llm.temperature",
                format!("temperature {} is high for an agent that calls tools", t),
            ));
        }
    }

    for path in &schema.changes().deprecated {
        if lookup(doc, path).is_some() {
            notes.push(Advisory::new(
                path,
                format!("field is deprecated as of schema {}", schema.version()),
            ));
        }
    }

    notes
}
