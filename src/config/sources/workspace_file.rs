//! Workspace config file sources: agentspec.toml and config/{env}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

/// Workspace-level settings file.
pub const WORKSPACE_FILE: &str = "agentspec.toml";

/// Selects `config/{name}.toml`.
pub const ENV_NAME_VAR: &str = "AGENTSPEC_ENV";

/// Add workspace config files to builder.
/// Precedence: agentspec.toml (base) then config/{AGENTSPEC_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base_config_path = workspace_root.join(WORKSPACE_FILE);
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_name = std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| "development".to_string());
    let env_config_path = workspace_root.join("config").join(format!("{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
