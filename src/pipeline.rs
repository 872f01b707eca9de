//! Pipeline Orchestrator
//!
//! Sequences validate, migrate and export for one manifest and aggregates the outcome
//! into a report. This is the only module that touches the filesystem: it reads
//! manifests and writes artifacts. Everything it calls is pure.

pub mod batch;
pub mod discover;
pub mod report;
pub mod writer;

pub use batch::{BatchItem, BatchOperation, BatchOutcome, BatchReport, BatchRunner};
pub use discover::{discover, discover_all};
pub use report::{
    ExitStatus, ExportReport, MigrateReport, MigrateStatus, TargetOutcome, TargetStatus,
    ValidateReport, WrittenArtifact,
};

use crate::config::AgentspecConfig;
use crate::error::{PipelineError, RegistryError};
use crate::export::{
    content_hash, to_hex, ExportArtifact, ExportOptions, ExportResult, Exporter, ExporterRegistry,
    Rejection,
};
use crate::manifest::{self, parse_api_version, Manifest, ManifestFormat};
use crate::migrate::{Deprecation, MigrationResult, Migrator};
use crate::schema::{SchemaRegistry, SchemaVersion, VersionSelector};
use crate::validator::{advisories, ValidationMode, ValidationResult, Validator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of compiling a manifest for one target, before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetExport {
    Exported {
        artifacts: Vec<ExportArtifact>,
        deprecations: Vec<Deprecation>,
    },
    Rejected(Rejection),
    MigrationUnsupported {
        reason: String,
    },
}

/// Registry, validator, migrator and exporters behind one invocation surface.
pub struct Pipeline {
    registry: SchemaRegistry,
    validator: Validator,
    migrator: Migrator,
    exporters: ExporterRegistry,
    config: AgentspecConfig,
}

impl Pipeline {
    /// Pipeline with the built-in schemas, migration steps and targets.
    pub fn new(config: AgentspecConfig) -> Result<Self, PipelineError> {
        let validator = Validator::new(config.pipeline.max_depth);
        Ok(Self {
            registry: SchemaRegistry::builtin()?,
            validator,
            migrator: Migrator::builtin().with_validator(validator),
            exporters: ExporterRegistry::builtin(),
            config,
        })
    }

    /// Pipeline with default configuration.
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::new(AgentspecConfig::default())
    }

    /// Register an additional target, replacing any built-in one of the same name.
    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.register(exporter);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn exporters(&self) -> &ExporterRegistry {
        &self.exporters
    }

    pub fn config(&self) -> &AgentspecConfig {
        &self.config
    }

    /// Schema a manifest is checked against.
    ///
    /// An explicit selector wins. Otherwise the manifest's `apiVersion` names the
    /// schema, and a missing or unparseable `apiVersion` falls back to
    /// `pipeline.default_schema`.
    pub fn schema_for(
        &self,
        manifest: &Manifest,
        selector: Option<&VersionSelector>,
    ) -> Result<&SchemaVersion, PipelineError> {
        if let Some(selector) = selector {
            return Ok(self.registry.resolve(selector)?);
        }
        if let Some(api_version) = manifest
            .api_version()
            .filter(|v| parse_api_version(v).is_some())
        {
            return Ok(self.registry.for_api_version(api_version)?);
        }
        let fallback = self.config.pipeline.default_selector().map_err(|e| {
            RegistryError::InvalidSelector(self.config.pipeline.default_schema.clone(), e)
        })?;
        Ok(self.registry.resolve(&fallback)?)
    }

    fn mode(&self, mode: Option<ValidationMode>) -> ValidationMode {
        mode.unwrap_or(self.config.pipeline.validation_mode)
    }

    pub fn validate_path(
        &self,
        path: &Path,
        selector: Option<&VersionSelector>,
        mode: Option<ValidationMode>,
    ) -> Result<ValidateReport, PipelineError> {
        let manifest = manifest::load(path)?;
        let mut report = self.validate_manifest(&manifest, selector, mode)?;
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    pub fn validate_manifest(
        &self,
        manifest: &Manifest,
        selector: Option<&VersionSelector>,
        mode: Option<ValidationMode>,
    ) -> Result<ValidateReport, PipelineError> {
        let schema = self.schema_for(manifest, selector)?;
        let mode = self.mode(mode);
        let result = self.validator.validate(manifest, schema, mode);

        info!(
            manifest = %manifest.display_name(),
            schema_version = %schema.version(),
            errors = result.errors().len(),
            "Validation finished"
        );
        Ok(ValidateReport {
            path: None,
            manifest: manifest.display_name(),
            schema_version: schema.version().to_string(),
            mode,
            advisories: advisories(manifest, schema),
            errors: result.errors().to_vec(),
        })
    }

    /// Migrate a manifest file. When `output` is given the migrated document is
    /// written there, as JSON for a `.json` path and YAML otherwise.
    pub fn migrate_path(
        &self,
        path: &Path,
        to: &VersionSelector,
        output: Option<&Path>,
    ) -> Result<MigrateReport, PipelineError> {
        let manifest = manifest::load(path)?;
        let mut report = self.migrate_manifest(&manifest, to)?;
        report.path = Some(path.to_path_buf());

        if let (Some(output), Some(migrated)) = (output, &report.migrated) {
            let text = match ManifestFormat::from_path(output) {
                Some(ManifestFormat::Json) => migrated.to_json_string()?,
                _ => migrated.to_yaml_string()?,
            };
            writer::write_atomic(output, text.as_bytes())?;
            debug!(output = %output.display(), "Wrote migrated manifest");
            report.output = Some(output.to_path_buf());
        }
        Ok(report)
    }

    pub fn migrate_manifest(
        &self,
        manifest: &Manifest,
        to: &VersionSelector,
    ) -> Result<MigrateReport, PipelineError> {
        let from = self.schema_for(manifest, None)?;
        let target = self.registry.resolve(to)?;
        let mut report = MigrateReport {
            path: None,
            manifest: manifest.display_name(),
            from: from.version().to_string(),
            to: target.version().to_string(),
            status: MigrateStatus::Migrated {
                deprecations: Vec::new(),
            },
            output: None,
            migrated: None,
        };

        if let ValidationResult::Invalid(errors) =
            self.validator.validate(manifest, from, self.mode(None))
        {
            warn!(
                manifest = %report.manifest,
                schema_version = %from.version(),
                errors = errors.len(),
                "Source manifest is invalid, not migrating"
            );
            report.status = MigrateStatus::InvalidSource { errors };
            return Ok(report);
        }

        match self.migrator.migrate(manifest, from, target) {
            MigrationResult::Migrated {
                manifest: migrated,
                deprecations,
            } => {
                report.status = MigrateStatus::Migrated { deprecations };
                report.migrated = Some(migrated);
            }
            MigrationResult::Unsupported {
                reason,
                diagnostics,
            } => {
                warn!(manifest = %report.manifest, %reason, "Migration unsupported");
                report.status = MigrateStatus::Unsupported {
                    reason,
                    diagnostics,
                };
            }
        }
        Ok(report)
    }

    /// Validate a manifest file and export it to every target under
    /// `out_dir/<target>/`. An empty target list means every registered target.
    pub fn export_path(
        &self,
        path: &Path,
        targets: &[String],
        out_dir: &Path,
        options: &ExportOptions,
    ) -> Result<ExportReport, PipelineError> {
        let exporters = self.select_exporters(targets)?;
        let manifest = manifest::load(path)?;
        let mut report = self.export_with(&manifest, &exporters, Some(out_dir), options)?;
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Export without writing. Artifact paths in the report are `<target>/<path>`.
    pub fn export_manifest(
        &self,
        manifest: &Manifest,
        targets: &[String],
        options: &ExportOptions,
    ) -> Result<ExportReport, PipelineError> {
        let exporters = self.select_exporters(targets)?;
        self.export_with(manifest, &exporters, None, options)
    }

    /// Migrate an already validated manifest to what `target` reads and run its
    /// exporter.
    pub fn export_target(
        &self,
        manifest: &Manifest,
        target: &str,
        options: &ExportOptions,
    ) -> Result<TargetExport, PipelineError> {
        let exporter = self.exporters.get(target)?;
        let from = self.schema_for(manifest, None)?;
        self.compile(manifest, from, exporter.as_ref(), options)
    }

    fn select_exporters(&self, targets: &[String]) -> Result<Vec<Arc<dyn Exporter>>, PipelineError> {
        if targets.is_empty() {
            return Ok(self.exporters.iter().cloned().collect());
        }
        targets.iter().map(|name| self.exporters.get(name)).collect()
    }

    fn export_with(
        &self,
        manifest: &Manifest,
        exporters: &[Arc<dyn Exporter>],
        out_dir: Option<&Path>,
        options: &ExportOptions,
    ) -> Result<ExportReport, PipelineError> {
        let from = self.schema_for(manifest, None)?;
        let mut report = ExportReport {
            path: None,
            manifest: manifest.display_name(),
            schema_version: from.version().to_string(),
            errors: Vec::new(),
            targets: Vec::with_capacity(exporters.len()),
        };

        if let ValidationResult::Invalid(errors) =
            self.validator.validate(manifest, from, self.mode(None))
        {
            warn!(manifest = %report.manifest, errors = errors.len(), "Manifest is invalid, not exporting");
            report.errors = errors;
            return Ok(report);
        }

        for exporter in exporters {
            let target = exporter.target().name;
            let status = match self.export_one(manifest, from, exporter.as_ref(), out_dir, options) {
                Ok(status) => status,
                Err(err) => {
                    warn!(manifest = %report.manifest, target, error = %err, "Target failed");
                    TargetStatus::Failed {
                        message: err.to_string(),
                        exit: ExitStatus::from(&err),
                    }
                }
            };
            report.targets.push(TargetOutcome {
                target: target.to_string(),
                status,
            });
        }
        Ok(report)
    }

    fn export_one(
        &self,
        manifest: &Manifest,
        from: &SchemaVersion,
        exporter: &dyn Exporter,
        out_dir: Option<&Path>,
        options: &ExportOptions,
    ) -> Result<TargetStatus, PipelineError> {
        let target = exporter.target().name;
        Ok(match self.compile(manifest, from, exporter, options)? {
            TargetExport::Exported {
                artifacts,
                deprecations,
            } => {
                let (dir, written) = match out_dir {
                    Some(out_dir) => {
                        let dir = writer::target_dir(out_dir, target)?;
                        let written = writer::write_artifacts(&dir, &artifacts)?;
                        (dir, written)
                    }
                    None => (PathBuf::from(target), in_memory(target, &artifacts)),
                };
                TargetStatus::Exported {
                    out_dir: dir,
                    artifacts: written,
                    deprecations,
                }
            }
            TargetExport::Rejected(rejection) => TargetStatus::Rejected { rejection },
            TargetExport::MigrationUnsupported { reason } => {
                TargetStatus::MigrationUnsupported { reason }
            }
        })
    }

    fn compile(
        &self,
        manifest: &Manifest,
        from: &SchemaVersion,
        exporter: &dyn Exporter,
        options: &ExportOptions,
    ) -> Result<TargetExport, PipelineError> {
        let target = exporter.target();
        let to = self
            .registry
            .get(&target.schema_version)
            .ok_or_else(|| RegistryError::NotFound(target.schema_version.to_string()))?;

        let (migrated, deprecations) = match self.migrator.migrate(manifest, from, to) {
            MigrationResult::Migrated {
                manifest,
                deprecations,
            } => (manifest, deprecations),
            MigrationResult::Unsupported { reason, .. } => {
                return Ok(TargetExport::MigrationUnsupported { reason })
            }
        };

        debug!(
            manifest = %migrated.display_name(),
            target = target.name,
            schema_version = %to.version(),
            "Exporting"
        );
        Ok(match exporter.export(&migrated, options)? {
            ExportResult::Exported(artifacts) => TargetExport::Exported {
                artifacts,
                deprecations,
            },
            ExportResult::Rejected(rejection) => TargetExport::Rejected(rejection),
        })
    }
}

fn in_memory(target: &str, artifacts: &[ExportArtifact]) -> Vec<WrittenArtifact> {
    artifacts
        .iter()
        .map(|artifact| WrittenArtifact {
            path: Path::new(target).join(&artifact.path),
            kind: artifact.kind,
            blake3: to_hex(&content_hash(artifact.content.as_bytes())),
        })
        .collect()
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("exporters", &self.exporters)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_str;
    use crate::validator::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    const AGENT: &str = r#"
apiVersion: agentspec/v0.4.0
kind: Agent
metadata:
  name: helper
  description: Answers questions
spec:
  role: You answer questions about the docs.
  llm:
    provider: anthropic
    model: claude-sonnet-4
"#;

    fn pipeline() -> Pipeline {
        Pipeline::builtin().unwrap()
    }

    #[test]
    fn test_schema_for_prefers_selector_then_api_version() {
        let pipeline = pipeline();
        let manifest = parse_str(AGENT, None).unwrap();
        assert_eq!(pipeline.schema_for(&manifest, None).unwrap().version().to_string(), "0.4.0");

        let selector: VersionSelector = "0.3.0".parse().unwrap();
        let schema = pipeline.schema_for(&manifest, Some(&selector)).unwrap();
        assert_eq!(schema.version().to_string(), "0.3.0");
    }

    #[test]
    fn test_missing_api_version_uses_default_schema() {
        let pipeline = pipeline();
        let manifest = parse_str("kind: Agent\nmetadata:\n  name: x\n", None).unwrap();
        let schema = pipeline.schema_for(&manifest, None).unwrap();
        assert_eq!(schema.version(), pipeline.registry().latest().version());

        let report = pipeline.validate_manifest(&manifest, None, None).unwrap();
        assert!(report
            .errors
            .iter()
            .any(|e| e.path.to_string() == "apiVersion" && e.kind == ErrorKind::MissingRequired));
    }

    #[test]
    fn test_unpublished_api_version_is_schema_not_found() {
        let pipeline = pipeline();
        let manifest = parse_str(&AGENT.replace("v0.4.0", "v9.0.0"), None).unwrap();
        let err = pipeline.validate_manifest(&manifest, None, None).unwrap_err();
        assert_eq!(ExitStatus::from(&err), ExitStatus::SchemaNotFound);
    }

    #[test]
    fn test_validate_path_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "kind: [unclosed").unwrap();
        let err = pipeline().validate_path(&path, None, None).unwrap_err();
        assert_eq!(ExitStatus::from(&err), ExitStatus::ParseError);
    }

    #[test]
    fn test_migrate_invalid_source_is_validation_failure() {
        let manifest = parse_str(&AGENT.replace("  role: You answer questions about the docs.\n", ""), None)
            .unwrap();
        let report = pipeline()
            .migrate_manifest(&manifest, &VersionSelector::Latest)
            .unwrap();
        assert_eq!(report.exit_status(), ExitStatus::ValidationFailed);
        assert!(report.migrated.is_none());
    }

    #[test]
    fn test_export_manifest_lists_relative_paths() {
        let manifest = parse_str(AGENT, None).unwrap();
        let report = pipeline()
            .export_manifest(&manifest, &["langchain".to_string()], &ExportOptions::default())
            .unwrap();
        assert_eq!(report.exit_status(), ExitStatus::Success);
        let TargetStatus::Exported { artifacts, .. } = &report.targets[0].status else {
            panic!("expected export, got {:?}", report.targets[0].status);
        };
        assert!(artifacts.iter().all(|a| a.path.starts_with("langchain")));
    }

    #[test]
    fn test_unknown_target_fails_before_reading() {
        let err = pipeline()
            .export_path(
                Path::new("does-not-exist.yaml"),
                &["helm".to_string()],
                Path::new("dist"),
                &ExportOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTarget(name) if name == "helm"));
    }
}
