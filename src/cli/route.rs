//! CLI route: single route table and run context. Dispatches to the pipeline and presentation.

use crate::cli::help::{command_name, output_format};
use crate::cli::output::OutputFormat;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_batch_text, format_export_text, format_migrate_text, format_schemas, format_targets,
    format_validate_text, to_json,
};
use crate::config::{AgentspecConfig, ConfigLoader};
use crate::error::PipelineError;
use crate::export::{ExportOptions, FeaturePolicy, MemoryBackend};
use crate::pipeline::{discover_all, BatchOperation, BatchRunner, ExitStatus, Pipeline};
use crate::schema::VersionSelector;
use crate::testgen::TestSelection;
use crate::validator::ValidationMode;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Rendered command output and the exit status it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub status: ExitStatus,
}

/// Runtime context for CLI execution: configuration and the pipeline built from it.
pub struct RunContext {
    pipeline: Arc<Pipeline>,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: AgentspecConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(config)?),
            workspace_root,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, PipelineError> {
        let started = Instant::now();
        let format = OutputFormat::parse(output_format(command))?;
        let output = self.execute_inner(command, format)?;
        info!(
            command = command_name(command),
            status = output.status.code(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(output)
    }

    fn execute_inner(&self, command: &Commands, format: OutputFormat) -> Result<CommandOutput, PipelineError> {
        let json_output = format == OutputFormat::Json;
        match command {
            Commands::Validate {
                paths, schema, mode, ..
            } => {
                let selector = schema.as_deref().map(parse_selector).transpose()?;
                let mode = mode
                    .as_deref()
                    .map(|m| m.parse::<ValidationMode>().map_err(PipelineError::Usage))
                    .transpose()?;
                let manifests = discover_all(paths)?;
                if let [single] = manifests.as_slice() {
                    let report = self.pipeline.validate_path(single, selector.as_ref(), mode)?;
                    let text = if json_output { to_json(&report)? } else { format_validate_text(&report) };
                    return Ok(CommandOutput { text, status: report.exit_status() });
                }
                self.batch(manifests, BatchOperation::Validate { selector, mode }, json_output)
            }
            Commands::Migrate {
                paths,
                to,
                output,
                output_dir,
                ..
            } => {
                let to = parse_selector(to)?;
                let manifests = discover_all(paths)?;
                if let [single] = manifests.as_slice() {
                    let output = match (output, output_dir) {
                        (Some(file), _) => Some(file.clone()),
                        (None, Some(dir)) => single.file_name().map(|name| dir.join(name)),
                        (None, None) => None,
                    };
                    let report = self.pipeline.migrate_path(single, &to, output.as_deref())?;
                    let text = if json_output { to_json(&report)? } else { format_migrate_text(&report) };
                    return Ok(CommandOutput { text, status: report.exit_status() });
                }
                if output.is_some() {
                    return Err(PipelineError::Usage(
                        "--output takes a single manifest; use --output-dir for several".to_string(),
                    ));
                }
                let operation = BatchOperation::Migrate {
                    to,
                    output_dir: output_dir.clone(),
                };
                self.batch(manifests, operation, json_output)
            }
            Commands::Export {
                paths,
                target,
                out_dir,
                tests,
                memory_backend,
                policies,
                timestamp,
                ..
            } => {
                let options = self.export_options(tests.as_deref(), memory_backend.as_deref(), policies, *timestamp)?;
                let out_dir = self.resolve(out_dir.as_deref().unwrap_or(self.pipeline.config().export.output_dir.as_path()));
                let manifests = discover_all(paths)?;
                if let [single] = manifests.as_slice() {
                    let report = self.pipeline.export_path(single, target, &out_dir, &options)?;
                    let text = if json_output { to_json(&report)? } else { format_export_text(&report) };
                    return Ok(CommandOutput { text, status: report.exit_status() });
                }
                for name in target {
                    self.pipeline.exporters().get(name)?;
                }
                let operation = BatchOperation::Export {
                    targets: target.clone(),
                    out_dir,
                    options,
                };
                self.batch(manifests, operation, json_output)
            }
            Commands::Schemas { .. } => Ok(CommandOutput {
                text: format_schemas(self.pipeline.registry(), json_output)?,
                status: ExitStatus::Success,
            }),
            Commands::Targets { .. } => Ok(CommandOutput {
                text: format_targets(self.pipeline.exporters(), json_output)?,
                status: ExitStatus::Success,
            }),
        }
    }

    fn batch(
        &self,
        manifests: Vec<PathBuf>,
        operation: BatchOperation,
        json_output: bool,
    ) -> Result<CommandOutput, PipelineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError::Task(format!("failed to start runtime: {}", e)))?;
        let runner = BatchRunner::new(Arc::clone(&self.pipeline));
        let report = runtime.block_on(runner.run(manifests, operation))?;
        let text = if json_output { to_json(&report)? } else { format_batch_text(&report) };
        Ok(CommandOutput {
            text,
            status: report.exit_status(),
        })
    }

    fn export_options(
        &self,
        tests: Option<&str>,
        memory_backend: Option<&str>,
        policies: &[String],
        timestamp: bool,
    ) -> Result<ExportOptions, PipelineError> {
        let mut options = self
            .pipeline
            .config()
            .export
            .options()
            .map_err(PipelineError::Usage)?;

        if let Some(tests) = tests {
            options.tests = if tests.trim().eq_ignore_ascii_case("none") {
                None
            } else {
                let selection: TestSelection = tests.parse().map_err(PipelineError::Usage)?;
                (!selection.is_empty()).then_some(selection)
            };
        }
        if let Some(backend) = memory_backend {
            options.memory_backend = backend.parse::<MemoryBackend>().map_err(PipelineError::Usage)?;
        }
        options.policy_overrides = parse_policies(policies)?;
        if timestamp {
            options.generated_at = Some(Utc::now());
        }
        Ok(options)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

fn parse_selector(raw: &str) -> Result<VersionSelector, PipelineError> {
    Ok(raw.parse::<VersionSelector>()?)
}

/// `feature=policy` pairs into an override map.
fn parse_policies(raw: &[String]) -> Result<BTreeMap<String, FeaturePolicy>, PipelineError> {
    raw.iter()
        .map(|pair| {
            let (feature, policy) = pair.split_once('=').ok_or_else(|| {
                PipelineError::Usage(format!("policy override '{}' must be FEATURE=POLICY", pair))
            })?;
            let policy = policy.trim().parse::<FeaturePolicy>().map_err(PipelineError::Usage)?;
            Ok((feature.trim().to_string(), policy))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(root: &Path) -> RunContext {
        RunContext::with_config(root.to_path_buf(), AgentspecConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_policies() {
        let map = parse_policies(&["tool:code_interpreter=degrade".to_string()]).unwrap();
        assert_eq!(map["tool:code_interpreter"], FeaturePolicy::Degrade);
        assert!(parse_policies(&["tool:code_interpreter".to_string()]).is_err());
    }

    #[test]
    fn test_tests_none_disables_generation() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context(temp_dir.path());
        let options = ctx.export_options(Some("none"), None, &[], false).unwrap();
        assert_eq!(options.tests, None);
        let options = ctx.export_options(Some("safety,load"), Some("redis"), &[], true).unwrap();
        assert_eq!(options.tests.unwrap().to_string(), "load,safety");
        assert_eq!(options.memory_backend, MemoryBackend::KeyValue);
        assert!(options.generated_at.is_some());
    }

    #[test]
    fn test_validate_batch_over_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("manifests");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("a.yaml"),
            "apiVersion: agentspec/v0.4.0\nkind: Task\nmetadata:\n  name: a\nspec:\n  steps:\n    - name: s\n      action: noop\n",
        )
        .unwrap();
        fs::write(dir.join("b.yaml"), "apiVersion: agentspec/v0.4.0\nkind: Task\nmetadata:\n  name: b\nspec: {}\n").unwrap();

        let output = context(temp_dir.path())
            .execute(&Commands::Validate {
                paths: vec![dir],
                schema: None,
                mode: None,
                format: "json".to_string(),
            })
            .unwrap();
        assert_eq!(output.status, ExitStatus::ValidationFailed);
        let value: serde_json::Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_format_is_usage_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = context(temp_dir.path())
            .execute(&Commands::Schemas {
                format: "xml".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, PipelineError::Usage(_)));
    }
}
