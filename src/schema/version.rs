//! Published schema versions and version selectors.

use super::node::{compile, SchemaNode};
use crate::error::RegistryError;
use crate::manifest::{api_version_for, parse_api_version};
use semver::{Version, VersionReq};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Field paths a version deprecated or removed relative to its predecessor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub deprecated: Vec<String>,
    pub removed: Vec<String>,
}

/// One published schema: version, raw document, compiled node tree.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    version: Version,
    document: Value,
    root: SchemaNode,
    changes: FieldChanges,
}

impl SchemaVersion {
    /// Compile a schema document. The document must declare its own `x-version`.
    pub fn compile(raw: &str) -> Result<Self, RegistryError> {
        let document: Value =
            serde_json::from_str(raw).map_err(|e| RegistryError::InvalidSchema {
                version: "unknown".to_string(),
                path: "#".to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    pub fn from_document(document: Value) -> Result<Self, RegistryError> {
        let declared = document
            .get("x-version")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::InvalidSchema {
                version: "unknown".to_string(),
                path: "#/x-version".to_string(),
                message: "schema document does not declare 'x-version'".to_string(),
            })?;
        let version = Version::parse(declared).map_err(|e| RegistryError::InvalidSchema {
            version: declared.to_string(),
            path: "#/x-version".to_string(),
            message: e.to_string(),
        })?;
        let label = version.to_string();
        let changes = FieldChanges {
            deprecated: string_list(&document, "deprecated", &label)?,
            removed: string_list(&document, "removed", &label)?,
        };
        let root = compile(&document, &label)?;
        Ok(Self {
            version,
            document,
            root,
            changes,
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn changes(&self) -> &FieldChanges {
        &self.changes
    }

    /// The `apiVersion` string manifests of this version carry.
    pub fn api_version(&self) -> String {
        api_version_for(&self.version)
    }

    pub fn series(&self) -> (u64, u64) {
        compatibility_series(&self.version)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

fn string_list(document: &Value, key: &str, version: &str) -> Result<Vec<String>, RegistryError> {
    let Some(list) = document.get("x-changes").and_then(|c| c.get(key)) else {
        return Ok(Vec::new());
    };
    let invalid = || RegistryError::InvalidSchema {
        version: version.to_string(),
        path: format!("#/x-changes/{}", key),
        message: "expected an array of field paths".to_string(),
    };
    list.as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

/// Semver compatibility series: `(major, 0)` from 1.0 on, `(0, minor)` below it.
pub fn compatibility_series(version: &Version) -> (u64, u64) {
    if version.major == 0 {
        (0, version.minor)
    } else {
        (version.major, 0)
    }
}

/// How a caller names a schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(Version),
    Range(VersionReq),
}

impl FromStr for VersionSelector {
    type Err = RegistryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(VersionSelector::Latest);
        }
        if let Some(version) = parse_api_version(trimmed) {
            return Ok(VersionSelector::Exact(version));
        }
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if let Ok(version) = Version::parse(bare) {
            return Ok(VersionSelector::Exact(version));
        }
        VersionReq::parse(trimmed)
            .map(VersionSelector::Range)
            .map_err(|e| RegistryError::InvalidSelector(raw.to_string(), e.to_string()))
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => f.write_str("latest"),
            VersionSelector::Exact(v) => write!(f, "{}", v),
            VersionSelector::Range(req) => write!(f, "{}", req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_forms() {
        let exact = Version::new(0, 3, 0);
        assert_eq!("latest".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
        assert_eq!("0.3.0".parse::<VersionSelector>().unwrap(), VersionSelector::Exact(exact.clone()));
        assert_eq!("v0.3.0".parse::<VersionSelector>().unwrap(), VersionSelector::Exact(exact.clone()));
        assert_eq!(
            "agentspec/v0.3.0".parse::<VersionSelector>().unwrap(),
            VersionSelector::Exact(exact)
        );
        assert!(matches!(
            "^0.3".parse::<VersionSelector>().unwrap(),
            VersionSelector::Range(_)
        ));
    }

    #[test]
    fn test_garbage_selector_is_invalid() {
        let err = "not a version!".parse::<VersionSelector>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSelector(..)));
    }

    #[test]
    fn test_compatibility_series() {
        assert_eq!(compatibility_series(&Version::new(0, 3, 1)), (0, 3));
        assert_eq!(compatibility_series(&Version::new(1, 4, 0)), (1, 0));
        assert_ne!(
            compatibility_series(&Version::new(0, 2, 0)),
            compatibility_series(&Version::new(0, 3, 0))
        );
    }

    #[test]
    fn test_missing_x_version_is_rejected() {
        let err = SchemaVersion::compile(r#"{"type": "object"}"#).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }

    #[test]
    fn test_changes_are_read() {
        let schema = SchemaVersion::compile(
            r#"{"x-version": "1.0.0", "x-changes": {"deprecated": ["a.b"], "removed": []}}"#,
        )
        .unwrap();
        assert_eq!(schema.changes().deprecated, vec!["a.b".to_string()]);
        assert_eq!(schema.api_version(), "agentspec/v1.0.0");
    }
}
