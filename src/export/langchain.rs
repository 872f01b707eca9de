//! `langchain` target: a Python service built on LangChain and FastAPI.
//!
//! Output is a flat set of modules (`agent.py`, `tools.py`, `memory.py`, `server.py`)
//! plus an OpenAPI description, a `pyproject.toml` and an `.env.example`.

mod agent;
mod memory;
mod openapi;
mod packaging;
mod server;
mod tools;

pub(crate) use agent::policies;
pub(crate) use tools::parameters as tool_parameters;

use super::{Exporter, ExportTarget, Feature, FeaturePolicy, Generator};
use crate::manifest::{ManifestKind, Provider};
use crate::testgen::TestProfile;
use semver::Version;

pub const TARGET_NAME: &str = "langchain";

/// Python chat-model binding for a provider: `(module, class, distribution)`.
pub(crate) fn provider_binding(provider: Provider) -> (&'static str, &'static str, &'static str) {
    match provider {
        Provider::Anthropic => ("langchain_anthropic", "ChatAnthropic", "langchain-anthropic>=0.3"),
        Provider::Openai => ("langchain_openai", "ChatOpenAI", "langchain-openai>=0.3"),
        Provider::Google => (
            "langchain_google_genai",
            "ChatGoogleGenerativeAI",
            "langchain-google-genai>=2.0",
        ),
        Provider::Azure => ("langchain_openai", "AzureChatOpenAI", "langchain-openai>=0.3"),
        Provider::Bedrock => ("langchain_aws", "ChatBedrockConverse", "langchain-aws>=0.2"),
        Provider::Groq => ("langchain_groq", "ChatGroq", "langchain-groq>=0.2"),
        Provider::Mistral => ("langchain_mistralai", "ChatMistralAI", "langchain-mistralai>=0.2"),
        Provider::Cohere => ("langchain_cohere", "ChatCohere", "langchain-cohere>=0.3"),
        Provider::Ollama => ("langchain_ollama", "ChatOllama", "langchain-ollama>=0.2"),
    }
}

pub struct LangChainExporter {
    target: ExportTarget,
    generators: Vec<Box<dyn Generator>>,
}

impl LangChainExporter {
    pub fn new() -> Self {
        Self {
            target: ExportTarget {
                name: TARGET_NAME,
                description: "LangChain agent served with FastAPI",
                kinds: &[ManifestKind::Agent],
                format_version: Version::new(1, 0, 0),
                schema_version: Version::new(0, 4, 0),
                test_profile: TestProfile::Application,
            },
            generators: vec![
                Box::new(tools::ToolsGenerator),
                Box::new(memory::MemoryGenerator),
                Box::new(agent::AgentGenerator),
                Box::new(server::ServerGenerator),
                Box::new(openapi::OpenApiGenerator),
                Box::new(packaging::PackagingGenerator),
            ],
        }
    }
}

impl Default for LangChainExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for LangChainExporter {
    fn target(&self) -> &ExportTarget {
        &self.target
    }

    fn policy(&self, feature: &Feature) -> FeaturePolicy {
        match feature {
            Feature::Tool(tool_type) if tool_type == "code_interpreter" => FeaturePolicy::Degrade,
            _ => FeaturePolicy::Supported,
        }
    }

    fn generators(&self) -> &[Box<dyn Generator>] {
        &self.generators
    }
}
