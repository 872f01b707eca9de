//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources replace earlier values key by key; lists are replaced whole.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("pipeline.default_schema", "latest")?
        .set_default("pipeline.validation_mode", "progressive")?
        .set_default("pipeline.max_depth", 32)?
        .set_default("export.memory_backend", "in-memory")?
        .set_default("export.tests", vec!["unit", "integration"])?
        .set_default("export.output_dir", "dist")?
        .set_default("batch.concurrency", 4)?
        .set_default("logging.level", "warn")?
        .set_default("logging.output", "stderr")
}
