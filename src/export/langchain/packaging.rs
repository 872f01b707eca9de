//! `pyproject.toml` and `.env.example`.

use super::provider_binding;
use crate::error::PipelineError;
use crate::export::python::identifier;
use crate::export::{ExportArtifact, ExportContext, Feature, Generator, MemoryBackend};
use crate::manifest::{Provider, ToolType};
use std::collections::BTreeSet;
use toml::{Table, Value};

pub struct PackagingGenerator;

const BASE_DEPENDENCIES: &[&str] = &[
    "fastapi>=0.110",
    "httpx>=0.27",
    "langchain>=0.3",
    "langchain-core>=0.3",
    "pydantic>=2.6",
    "uvicorn>=0.29",
];

const TEST_DEPENDENCIES: &[&str] = &["pytest>=8.0", "pytest-asyncio>=0.23", "respx>=0.21"];

impl Generator for PackagingGenerator {
    fn name(&self) -> &'static str {
        "packaging"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        Ok(vec![
            ExportArtifact::config("pyproject.toml", pyproject(ctx)?),
            ExportArtifact::config(".env.example", env_example(ctx)),
        ])
    }
}

fn providers(ctx: &ExportContext<'_>) -> Vec<Provider> {
    let Some(agent) = ctx.agent() else {
        return Vec::new();
    };
    let mut providers = vec![agent.llm.provider];
    if !ctx.is_degraded(&Feature::FallbackModels) {
        providers.extend(agent.llm.fallback_models.iter().map(|f| f.provider));
    }
    providers
}

fn dependencies(ctx: &ExportContext<'_>) -> BTreeSet<&'static str> {
    let mut deps: BTreeSet<&'static str> = BASE_DEPENDENCIES.iter().copied().collect();
    for provider in providers(ctx) {
        deps.insert(provider_binding(provider).2);
    }
    match ctx.memory_backend() {
        Some(MemoryBackend::KeyValue) => {
            deps.insert("langchain-community>=0.3");
            deps.insert("redis>=5.0");
        }
        Some(MemoryBackend::Relational) => {
            deps.insert("langchain-community>=0.3");
            deps.insert("sqlalchemy>=2.0");
        }
        _ => {}
    }
    deps
}

fn strings<'a>(items: impl IntoIterator<Item = &'a str>) -> Value {
    Value::Array(items.into_iter().map(|s| Value::String(s.to_string())).collect())
}

fn pyproject(ctx: &ExportContext<'_>) -> Result<String, PipelineError> {
    let mut project = Table::new();
    project.insert("name".into(), Value::String(ctx.name().to_string()));
    project.insert(
        "version".into(),
        Value::String(ctx.metadata.version.clone().unwrap_or_else(|| "0.1.0".to_string())),
    );
    if let Some(description) = &ctx.metadata.description {
        project.insert("description".into(), Value::String(description.clone()));
    }
    project.insert("requires-python".into(), Value::String(">=3.10".to_string()));
    project.insert("dependencies".into(), strings(dependencies(ctx)));

    let mut optional = Table::new();
    optional.insert("test".into(), strings(TEST_DEPENDENCIES.iter().copied()));
    project.insert("optional-dependencies".into(), Value::Table(optional));

    let mut scripts = Table::new();
    scripts.insert(
        identifier(ctx.name()).replace('_', "-"),
        Value::String("server:main".to_string()),
    );
    project.insert("scripts".into(), Value::Table(scripts));

    let mut pytest = Table::new();
    pytest.insert("testpaths".into(), strings(["tests"]));
    pytest.insert("asyncio_mode".into(), Value::String("auto".to_string()));
    let mut ini = Table::new();
    ini.insert("ini_options".into(), Value::Table(pytest));
    let mut agentspec = Table::new();
    agentspec.insert("target".into(), Value::String(ctx.target.name.to_string()));
    agentspec.insert(
        "format-version".into(),
        Value::String(ctx.target.format_version.to_string()),
    );
    agentspec.insert(
        "schema-version".into(),
        Value::String(ctx.target.schema_version.to_string()),
    );
    let mut tool = Table::new();
    tool.insert("pytest".into(), Value::Table(ini));
    tool.insert("agentspec".into(), Value::Table(agentspec));

    let mut build = Table::new();
    build.insert("requires".into(), strings(["setuptools>=68"]));
    build.insert("build-backend".into(), Value::String("setuptools.build_meta".to_string()));

    let mut root = Table::new();
    root.insert("build-system".into(), Value::Table(build));
    root.insert("project".into(), Value::Table(project));
    root.insert("tool".into(), Value::Table(tool));

    Ok(toml::to_string(&root)?)
}

fn env_example(ctx: &ExportContext<'_>) -> String {
    let mut out = format!("# Environment for {}. Copy to .env and fill in.\n", ctx.name());
    let mut seen = BTreeSet::new();
    for provider in providers(ctx) {
        if let Some(var) = provider.api_key_env() {
            if seen.insert(var) {
                out.push_str(&format!("{}=\n", var));
            }
        }
        match provider {
            Provider::Azure => out.push_str("AZURE_OPENAI_ENDPOINT=\nOPENAI_API_VERSION=\n"),
            Provider::Bedrock => out.push_str("AWS_ACCESS_KEY_ID=\nAWS_REGION=us-east-1\n"),
            Provider::Ollama => out.push_str("OLLAMA_BASE_URL=http://localhost:11434\n"),
            _ => {}
        }
    }
    match ctx.memory_backend() {
        Some(MemoryBackend::KeyValue) => out.push_str("REDIS_URL=redis://localhost:6379/0\n"),
        Some(MemoryBackend::Relational) => out.push_str("DATABASE_URL=sqlite:///chat_history.db\n"),
        _ => {}
    }
    for tool in ctx.active_tools() {
        match tool.tool_type {
            ToolType::Retrieval => out.push_str(&format!(
                "{}_RETRIEVER_URL=\n",
                identifier(&tool.name).to_uppercase()
            )),
            ToolType::Mcp => {
                let server = tool.server.as_deref().unwrap_or(&tool.name);
                out.push_str(&format!(
                    "MCP_SERVER_{}_URL=\n",
                    server.to_uppercase().replace('-', "_")
                ));
            }
            _ => {}
        }
    }
    out.push_str("TOOL_HTTP_TIMEOUT=30\nPORT=8000\n");
    out.push_str("# Set to 1 to let generated tests call the real model provider.\nAGENTSPEC_LIVE_PROVIDER=0\n");
    out
}
