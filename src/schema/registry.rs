use super::catalog::BUILTIN_SCHEMAS;
use super::version::{SchemaVersion, VersionSelector};
use crate::error::RegistryError;
use crate::manifest::parse_api_version;
use semver::Version;
use std::collections::BTreeSet;
use tracing::debug;

/// Read-only catalog of compiled schema versions, ascending by version.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    versions: Vec<SchemaVersion>,
}

impl SchemaRegistry {
    /// Compile the schemas shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_documents(BUILTIN_SCHEMAS.iter().map(|(_, raw)| *raw))
    }

    /// Compile a set of schema documents. Duplicate versions are rejected.
    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RegistryError> {
        let mut versions = documents
            .into_iter()
            .map(SchemaVersion::compile)
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_by(|a, b| a.version().cmp(b.version()));

        if versions.is_empty() {
            return Err(RegistryError::NotFound("any schema version".to_string()));
        }
        if let Some(pair) = versions.windows(2).find(|w| w[0].version() == w[1].version()) {
            return Err(RegistryError::InvalidSchema {
                version: pair[0].version().to_string(),
                path: "#/x-version".to_string(),
                message: "version published twice".to_string(),
            });
        }

        debug!(
            versions = %versions.iter().map(|v| v.version().to_string()).collect::<Vec<_>>().join(", "),
            "Schema registry initialized"
        );
        Ok(Self { versions })
    }

    /// Resolve a selector to one published schema.
    pub fn resolve(&self, selector: &VersionSelector) -> Result<&SchemaVersion, RegistryError> {
        match selector {
            VersionSelector::Latest => Ok(self.latest()),
            VersionSelector::Exact(version) => self
                .get(version)
                .ok_or_else(|| RegistryError::NotFound(version.to_string())),
            VersionSelector::Range(req) => {
                let matches: Vec<&SchemaVersion> =
                    self.versions.iter().filter(|v| req.matches(v.version())).collect();
                let series: BTreeSet<(u64, u64)> = matches.iter().map(|v| v.series()).collect();
                match (matches.last(), series.len()) {
                    (None, _) => Err(RegistryError::NotFound(req.to_string())),
                    (Some(highest), 1) => Ok(*highest),
                    _ => Err(RegistryError::Ambiguous {
                        selector: req.to_string(),
                        matches: matches
                            .iter()
                            .map(|v| v.version().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }
    }

    /// Parse and resolve a textual selector.
    pub fn resolve_str(&self, selector: &str) -> Result<&SchemaVersion, RegistryError> {
        self.resolve(&selector.parse()?)
    }

    pub fn get(&self, version: &Version) -> Option<&SchemaVersion> {
        self.versions.iter().find(|v| v.version() == version)
    }

    pub fn latest(&self) -> &SchemaVersion {
        // Construction guarantees at least one version.
        &self.versions[self.versions.len() - 1]
    }

    pub fn versions(&self) -> &[SchemaVersion] {
        &self.versions
    }

    /// Schema for an `apiVersion` string such as `agentspec/v0.3.0`.
    pub fn for_api_version(&self, api_version: &str) -> Result<&SchemaVersion, RegistryError> {
        let version = parse_api_version(api_version)
            .ok_or_else(|| RegistryError::NotFound(api_version.to_string()))?;
        self.get(&version)
            .ok_or_else(|| RegistryError::NotFound(api_version.to_string()))
    }
}
