//! agentspec: Vendor-Neutral Agent Manifests
//!
//! Validates agent manifests against versioned schemas, migrates them between schema
//! versions and compiles them into deployable artifacts for target platforms, with
//! generated test suites. The pipeline is offline and deterministic.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod manifest;
pub mod migrate;
pub mod pipeline;
pub mod schema;
pub mod testgen;
pub mod validator;

pub use error::{ConfigError, ParseError, PipelineError, RegistryError};
pub use manifest::Manifest;
pub use pipeline::{ExitStatus, Pipeline};
pub use schema::{SchemaRegistry, SchemaVersion, VersionSelector};
pub use validator::{ValidationMode, ValidationResult, Validator};
