//! Per-invocation reports and their process exit status.

use crate::error::PipelineError;
use crate::export::{ArtifactKind, Rejection};
use crate::manifest::Manifest;
use crate::migrate::Deprecation;
use crate::validator::{Advisory, ValidationError, ValidationMode};
use serde::Serialize;
use std::path::PathBuf;

/// Process exit status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    Success,
    /// I/O or configuration failure.
    Failure,
    ParseError,
    ValidationFailed,
    MigrationUnsupported,
    ExportRejected,
    /// Schema version not found or ambiguous.
    SchemaNotFound,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::ParseError => 2,
            ExitStatus::ValidationFailed => 3,
            ExitStatus::MigrationUnsupported => 4,
            ExitStatus::ExportRejected => 5,
            ExitStatus::SchemaNotFound => 6,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ExitStatus::Success
    }
}

impl From<&PipelineError> for ExitStatus {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::Parse(_) => ExitStatus::ParseError,
            PipelineError::Registry(_) => ExitStatus::SchemaNotFound,
            _ => ExitStatus::Failure,
        }
    }
}

/// First non-success status, in order.
pub(crate) fn first_failure(statuses: impl IntoIterator<Item = ExitStatus>) -> ExitStatus {
    statuses
        .into_iter()
        .find(|s| !s.is_success())
        .unwrap_or(ExitStatus::Success)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub manifest: String,
    pub schema_version: String,
    pub mode: ValidationMode,
    pub errors: Vec<ValidationError>,
    pub advisories: Vec<Advisory>,
}

impl ValidateReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.is_valid() {
            ExitStatus::Success
        } else {
            ExitStatus::ValidationFailed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum MigrateStatus {
    Migrated {
        deprecations: Vec<Deprecation>,
    },
    /// The source manifest does not validate against its own schema.
    InvalidSource {
        errors: Vec<ValidationError>,
    },
    Unsupported {
        reason: String,
        diagnostics: Vec<ValidationError>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub manifest: String,
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub status: MigrateStatus,
    /// Where the migrated document was written, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip)]
    pub migrated: Option<Manifest>,
}

impl MigrateReport {
    pub fn exit_status(&self) -> ExitStatus {
        match self.status {
            MigrateStatus::Migrated { .. } => ExitStatus::Success,
            MigrateStatus::InvalidSource { .. } => ExitStatus::ValidationFailed,
            MigrateStatus::Unsupported { .. } => ExitStatus::MigrationUnsupported,
        }
    }
}

/// A file written by an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub blake3: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TargetStatus {
    Exported {
        #[serde(rename = "outDir")]
        out_dir: PathBuf,
        artifacts: Vec<WrittenArtifact>,
        deprecations: Vec<Deprecation>,
    },
    Rejected {
        rejection: Rejection,
    },
    MigrationUnsupported {
        reason: String,
    },
    Failed {
        message: String,
        #[serde(skip)]
        exit: ExitStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    #[serde(flatten)]
    pub status: TargetStatus,
}

impl TargetOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match &self.status {
            TargetStatus::Exported { .. } => ExitStatus::Success,
            TargetStatus::Rejected { .. } => ExitStatus::ExportRejected,
            TargetStatus::MigrationUnsupported { .. } => ExitStatus::MigrationUnsupported,
            TargetStatus::Failed { exit, .. } => *exit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub manifest: String,
    pub schema_version: String,
    /// Validation errors that stopped the export before any target ran.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    pub targets: Vec<TargetOutcome>,
}

impl ExportReport {
    pub fn exit_status(&self) -> ExitStatus {
        if !self.errors.is_empty() {
            return ExitStatus::ValidationFailed;
        }
        first_failure(self.targets.iter().map(TargetOutcome::exit_status))
    }
}
