use serde::Serialize;
use std::fmt;

/// Role of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Source,
    Config,
    Specification,
    Test,
    Warning,
    Metadata,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Source => "source",
            ArtifactKind::Config => "config",
            ArtifactKind::Specification => "specification",
            ArtifactKind::Test => "test",
            ArtifactKind::Warning => "warning",
            ArtifactKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated file, relative to the target's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub path: String,
    pub content: String,
    pub kind: ArtifactKind,
}

impl ExportArtifact {
    pub fn new(path: impl Into<String>, kind: ArtifactKind, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind,
        }
    }

    pub fn source(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, ArtifactKind::Source, content)
    }

    pub fn config(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, ArtifactKind::Config, content)
    }

    pub fn specification(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, ArtifactKind::Specification, content)
    }

    pub fn test(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, ArtifactKind::Test, content)
    }
}
