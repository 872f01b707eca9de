//! Reading manifests from YAML or JSON text.

use super::Manifest;
use crate::error::ParseError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Source format of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Infer the format from a file extension. Unknown extensions yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ManifestFormat::Yaml),
            "json" => Some(ManifestFormat::Json),
            _ => None,
        }
    }
}

/// Parse manifest text. Without an explicit format, YAML is tried first, then JSON.
pub fn parse_str(input: &str, format: Option<ManifestFormat>) -> Result<Manifest, ParseError> {
    let document = match format {
        Some(ManifestFormat::Yaml) => parse_yaml(input)?,
        Some(ManifestFormat::Json) => parse_json(input)?,
        None => match parse_yaml(input) {
            Ok(doc) => doc,
            Err(yaml_err) => parse_json(input).map_err(|_| yaml_err)?,
        },
    };
    Manifest::from_value(document)
}

/// Read and parse a manifest file.
pub fn load(path: &Path) -> Result<Manifest, ParseError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let format = ManifestFormat::from_path(path);
    debug!(path = %path.display(), ?format, "Parsing manifest");
    parse_str(&raw, format)
}

fn parse_yaml(input: &str) -> Result<Value, ParseError> {
    serde_yaml::from_str::<Value>(input).map_err(|e| ParseError::Yaml(e.to_string()))
}

fn parse_json(input: &str) -> Result<Value, ParseError> {
    serde_json::from_str::<Value>(input).map_err(|e| ParseError::Json(e.to_string()))
}
