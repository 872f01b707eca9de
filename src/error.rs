//! Error types for the agent manifest pipeline.
//!
//! Validation failures, unsupported migrations and rejected exports are pipeline
//! *results*, not errors: they live in `validator`, `migrate` and `export`. The
//! enums here cover the failures that stop an invocation outright.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed input document (StructureParseError).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed YAML: {0}")]
    Yaml(String),

    #[error("Malformed JSON: {0}")]
    Json(String),

    #[error("Manifest document must be a mapping at the top level, found {0}")]
    NotAMapping(&'static str),
}

/// Schema registry lookup and compilation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No published schema matches '{0}'")]
    NotFound(String),

    #[error("Selector '{selector}' matches more than one schema series: {matches}")]
    Ambiguous { selector: String, matches: String },

    #[error("Invalid version selector '{0}': {1}")]
    InvalidSelector(String, String),

    #[error("Schema {version} is invalid at '{path}': {message}")]
    InvalidSchema {
        version: String,
        path: String,
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Configuration validation failed:\n{0}")]
    Invalid(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Errors surfaced by the pipeline orchestrator (the I/O boundary).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Structure parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Schema registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Unknown export target '{0}'")]
    UnknownTarget(String),

    #[error("Refusing to write artifact outside the output directory: {0}")]
    UnsafeArtifactPath(String),

    #[error("Batch task failed: {0}")]
    Task(String),

    #[error("Invalid argument: {0}")]
    Usage(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(err: toml::ser::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
