//! Configuration System
//!
//! Layered settings for the pipeline, exporters, batch runs and logging. Layers in
//! increasing precedence: built-in defaults, the global file, the workspace
//! `agentspec.toml`, `config/{AGENTSPEC_ENV}.toml`, then `AGENTSPEC__SECTION__KEY`
//! environment variables.

use crate::error::ConfigError;
use crate::export::{ExportOptions, MemoryBackend};
use crate::logging::LoggingConfig;
use crate::schema::VersionSelector;
use crate::testgen::TestSelection;
use crate::validator::{ValidationMode, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentspecConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Selector used when a manifest has no usable `apiVersion`.
    #[serde(default = "default_schema")]
    pub default_schema: String,

    #[serde(default)]
    pub validation_mode: ValidationMode,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_schema() -> String {
    "latest".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_schema: default_schema(),
            validation_mode: ValidationMode::default(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub memory_backend: MemoryBackend,

    /// Test categories generated with every export; empty disables tests.
    #[serde(default = "default_tests")]
    pub tests: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_tests() -> Vec<String> {
    vec!["unit".to_string(), "integration".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            memory_backend: MemoryBackend::default(),
            tests: default_tests(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Manifests processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl ExportConfig {
    pub fn test_selection(&self) -> Result<TestSelection, String> {
        TestSelection::parse_list(&self.tests)
    }

    /// Export options implied by this section.
    pub fn options(&self) -> Result<ExportOptions, String> {
        let selection = self.test_selection()?;
        Ok(ExportOptions {
            memory_backend: self.memory_backend,
            tests: (!selection.is_empty()).then_some(selection),
            ..ExportOptions::default()
        })
    }
}

impl PipelineConfig {
    pub fn default_selector(&self) -> Result<VersionSelector, String> {
        self.default_schema.parse().map_err(|e| format!("{}", e))
    }
}

impl AgentspecConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.pipeline.default_selector() {
            errors.push(format!("pipeline.default_schema: {}", e));
        }
        if self.pipeline.max_depth == 0 {
            errors.push("pipeline.max_depth: must be at least 1".to_string());
        }
        if let Err(e) = self.export.test_selection() {
            errors.push(format!("export.tests: {}", e));
        }
        if self.export.output_dir.as_os_str().is_empty() {
            errors.push("export.output_dir: cannot be empty".to_string());
        }
        if self.batch.concurrency == 0 {
            errors.push("batch.concurrency: must be at least 1".to_string());
        }
        if let Err(e) = self.logging.validate() {
            errors.push(format!("logging: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("\n")))
        }
    }
}

/// Builds an [`AgentspecConfig`] from the configuration layers.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load every layer for `workspace_root` and validate the result.
    pub fn load(workspace_root: &Path) -> Result<AgentspecConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: AgentspecConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load a single file on top of the defaults, skipping the other layers.
    pub fn load_from_file(path: &Path) -> Result<AgentspecConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Load(format!(
                "configuration file {} does not exist",
                path.display()
            )));
        }
        let config: AgentspecConfig = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
