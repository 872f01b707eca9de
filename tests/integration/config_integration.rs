//! Configuration layering against a real workspace directory

use super::test_utils::EnvGuard;
use agentspec::config::{AgentspecConfig, ConfigLoader};
use agentspec::export::MemoryBackend;
use agentspec::validator::ValidationMode;
use agentspec::ConfigError;
use tempfile::TempDir;

fn isolated_home(temp_dir: &TempDir) -> String {
    temp_dir.path().join("xdg").to_string_lossy().into_owned()
}

#[test]
fn test_defaults_without_any_file() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = isolated_home(&temp_dir);
    let _env = EnvGuard::set(&[("XDG_CONFIG_HOME", xdg.as_str()), ("AGENTSPEC_ENV", "development")]);

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    assert_eq!(config, AgentspecConfig::default());
}

#[test]
fn test_workspace_then_environment_file() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = isolated_home(&temp_dir);
    std::fs::write(
        temp_dir.path().join("agentspec.toml"),
        r#"
[pipeline]
validation_mode = "fail-fast"

[export]
memory_backend = "relational"

[batch]
concurrency = 2
"#,
    )
    .unwrap();
    std::fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    std::fs::write(
        temp_dir.path().join("config/ci.toml"),
        "[batch]\nconcurrency = 16\n",
    )
    .unwrap();

    let _env = EnvGuard::set(&[("XDG_CONFIG_HOME", xdg.as_str()), ("AGENTSPEC_ENV", "ci")]);
    let config = ConfigLoader::load(temp_dir.path()).unwrap();

    assert_eq!(config.pipeline.validation_mode, ValidationMode::FailFast);
    assert_eq!(config.export.memory_backend, MemoryBackend::Relational);
    assert_eq!(config.batch.concurrency, 16);
}

#[test]
fn test_global_file_sits_below_workspace() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = isolated_home(&temp_dir);
    std::fs::create_dir_all(temp_dir.path().join("xdg/agentspec")).unwrap();
    std::fs::write(
        temp_dir.path().join("xdg/agentspec/config.toml"),
        "[pipeline]\ndefault_schema = \"0.3\"\nmax_depth = 8\n",
    )
    .unwrap();
    std::fs::write(temp_dir.path().join("agentspec.toml"), "[pipeline]\nmax_depth = 12\n").unwrap();

    let _env = EnvGuard::set(&[("XDG_CONFIG_HOME", xdg.as_str()), ("AGENTSPEC_ENV", "development")]);
    let config = ConfigLoader::load(temp_dir.path()).unwrap();

    assert_eq!(config.pipeline.default_schema, "0.3");
    assert_eq!(config.pipeline.max_depth, 12);
}

#[test]
fn test_environment_variables_win() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = isolated_home(&temp_dir);
    std::fs::write(temp_dir.path().join("agentspec.toml"), "[batch]\nconcurrency = 2\n").unwrap();

    let _env = EnvGuard::set(&[
        ("XDG_CONFIG_HOME", xdg.as_str()),
        ("AGENTSPEC_ENV", "development"),
        ("AGENTSPEC__BATCH__CONCURRENCY", "9"),
        ("AGENTSPEC__EXPORT__TESTS", "safety,load"),
    ]);
    let config = ConfigLoader::load(temp_dir.path()).unwrap();

    assert_eq!(config.batch.concurrency, 9);
    assert_eq!(config.export.test_selection().unwrap().to_string(), "load,safety");
}

#[test]
fn test_invalid_layer_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let xdg = isolated_home(&temp_dir);
    std::fs::write(temp_dir.path().join("agentspec.toml"), "[batch]\nconcurrency = 0\n").unwrap();

    let _env = EnvGuard::set(&[("XDG_CONFIG_HOME", xdg.as_str()), ("AGENTSPEC_ENV", "development")]);
    let err = ConfigLoader::load(temp_dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(message) if message.contains("batch.concurrency")));
}
