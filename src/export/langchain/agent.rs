//! `agent.py`: model construction, prompt, tool-calling agent and its policies.

use super::provider_binding;
use crate::error::PipelineError;
use crate::export::python::{class_name, identifier, literal, string_literal};
use crate::export::{ExportArtifact, ExportContext, Feature, Generator};
use crate::manifest::{AgentSpec, LlmConfig, Provider};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub struct AgentGenerator;

/// Turn cap used when a manifest sets none.
const DEFAULT_MAX_TURNS: u64 = 15;

impl Generator for AgentGenerator {
    fn name(&self) -> &'static str {
        "agent"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let Some(agent) = ctx.agent() else {
            return Ok(Vec::new());
        };
        let fallbacks = if ctx.is_degraded(&Feature::FallbackModels) {
            Vec::new()
        } else {
            agent.llm.fallback_models.clone()
        };

        let mut imports: BTreeSet<(&str, &str)> = BTreeSet::new();
        imports.insert(provider_import(agent.llm.provider));
        for fallback in &fallbacks {
            imports.insert(provider_import(fallback.provider));
        }

        let mut out = format!(
            "\"\"\"{} agent. Generated by agentspec from manifest '{}'.\"\"\"\n\n",
            class_name(ctx.name()),
            ctx.name()
        );
        out.push_str("from __future__ import annotations\n\nimport os\nimport re\n\n");
        out.push_str("from langchain.agents import AgentExecutor, create_tool_calling_agent\n");
        out.push_str("from langchain_core.prompts import ChatPromptTemplate, MessagesPlaceholder\n");
        out.push_str("from langchain_core.runnables.history import RunnableWithMessageHistory\n");
        for (module, class) in &imports {
            out.push_str(&format!("from {} import {}\n", module, class));
        }
        out.push_str("\nimport memory\nfrom tools import TOOLS\n\n");

        out.push_str(&format!("AGENT_NAME = {}\n", string_literal(ctx.name())));
        // Braces would be read as prompt template variables.
        let prompt = agent.role.replace('{', "{{").replace('}', "}}");
        out.push_str(&format!("SYSTEM_PROMPT = {}\n", string_literal(&prompt)));
        out.push_str(&format!(
            "MAX_TURNS = {}\n",
            agent
                .limits()
                .and_then(|l| l.max_turns)
                .unwrap_or(DEFAULT_MAX_TURNS)
        ));
        out.push_str(&format!("POLICIES = {}\n", literal(&policies(agent))));
        out.push_str(&format!(
            "REQUIRE_APPROVAL = {}\n",
            literal(&json!(approval_list(ctx, agent)))
        ));
        out.push_str(&format!(
            "REDACT_PII = {}\n\n",
            if ctx.features.contains(&Feature::PiiRedaction) && !ctx.is_degraded(&Feature::PiiRedaction) {
                "True"
            } else {
                "False"
            }
        ));

        out.push_str("\ndef build_llm():\n");
        out.push_str(&format!("    llm = {}\n", model_call(&agent.llm, agent)));
        if !fallbacks.is_empty() {
            let calls: Vec<String> = fallbacks
                .iter()
                .map(|f| {
                    model_call(
                        &LlmConfig {
                            provider: f.provider,
                            model: f.model.clone(),
                            temperature: agent.llm.temperature,
                            max_tokens: agent.llm.max_tokens,
                            top_p: None,
                            fallback_models: Vec::new(),
                        },
                        agent,
                    )
                })
                .collect();
            out.push_str(&format!(
                "    llm = llm.with_fallbacks([\n        {},\n    ])\n",
                calls.join(",\n        ")
            ));
        }
        out.push_str("    return llm\n");
        out.push_str(RUNTIME);

        Ok(vec![ExportArtifact::source("agent.py", out)])
    }
}

fn provider_import(provider: Provider) -> (&'static str, &'static str) {
    let (module, class, _) = provider_binding(provider);
    (module, class)
}

fn model_call(llm: &LlmConfig, agent: &AgentSpec) -> String {
    let (_, class, _) = provider_binding(llm.provider);
    let model_arg = match llm.provider {
        Provider::Azure => "azure_deployment",
        _ => "model",
    };
    let mut args = vec![format!("{}={}", model_arg, string_literal(&llm.model))];
    if let Some(t) = llm.temperature {
        args.push(format!("temperature={}", t));
    }
    let max_tokens = llm
        .max_tokens
        .or_else(|| agent.budget().and_then(|b| b.max_tokens_per_request));
    if let Some(m) = max_tokens {
        let key = match llm.provider {
            Provider::Ollama => "num_predict",
            _ => "max_tokens",
        };
        args.push(format!("{}={}", key, m));
    }
    if let Some(p) = llm.top_p {
        args.push(format!("top_p={}", p));
    }
    format!("{}({})", class, args.join(", "))
}

fn approval_list(ctx: &ExportContext<'_>, agent: &AgentSpec) -> Vec<String> {
    if ctx.is_degraded(&Feature::HumanApproval) {
        return Vec::new();
    }
    agent
        .autonomy
        .as_ref()
        .map(|a| a.require_approval.iter().map(|name| identifier_or_star(name)).collect())
        .unwrap_or_default()
}

fn identifier_or_star(name: &str) -> String {
    if name == "*" {
        name.to_string()
    } else {
        identifier(name)
    }
}

/// Budget and limit settings the server enforces at runtime.
pub(crate) fn policies(agent: &AgentSpec) -> Value {
    let budget = agent.budget();
    let limits = agent.limits();
    let rate = agent.safety.as_ref().and_then(|s| s.rate_limits.as_ref());
    json!({
        "max_tokens_per_day": budget.and_then(|b| b.max_tokens_per_day),
        "max_tokens_per_request": budget.and_then(|b| b.max_tokens_per_request),
        "max_cost_per_day": budget.and_then(|b| b.max_cost_per_day),
        "timeout_seconds": limits.and_then(|l| l.timeout_seconds),
        "max_concurrent_requests": limits.and_then(|l| l.max_concurrent_requests),
        "requests_per_minute": rate.and_then(|r| r.requests_per_minute),
    })
}

const RUNTIME: &str = r#"

_EMAIL = re.compile(r"[\w.+-]+@[\w-]+\.[\w.]+")
_PHONE = re.compile(r"\+?\d[\d\s().-]{7,}\d")


def redact(text: str) -> str:
    if not REDACT_PII:
        return text
    return _PHONE.sub("[REDACTED]", _EMAIL.sub("[REDACTED]", text))


def _approved(tool_name: str) -> bool:
    if os.environ.get("AGENTSPEC_AUTO_APPROVE") == "1":
        return True
    return "*" not in REQUIRE_APPROVAL and tool_name not in REQUIRE_APPROVAL


def _guard(tools):
    guarded = []
    for t in tools:
        if _approved(t.name):
            guarded.append(t)
            continue

        def gated(*args, _name=t.name, **kwargs):
            return f"Tool '{_name}' requires human approval; the request was not executed."

        guarded.append(t.copy(update={"func": gated}))
    return guarded


def build_agent():
    llm = build_llm()
    if getattr(memory, "set_summarizer", None):
        memory.set_summarizer(llm)
    prompt = ChatPromptTemplate.from_messages(
        [
            ("system", SYSTEM_PROMPT),
            MessagesPlaceholder("chat_history"),
            ("human", "{input}"),
            MessagesPlaceholder("agent_scratchpad"),
        ]
    )
    tools = _guard(TOOLS)
    agent = create_tool_calling_agent(llm, tools, prompt)
    executor = AgentExecutor(
        agent=agent,
        tools=tools,
        max_iterations=MAX_TURNS,
        max_execution_time=POLICIES["timeout_seconds"],
    )
    return RunnableWithMessageHistory(
        executor,
        memory.get_session_history,
        input_messages_key="input",
        history_messages_key="chat_history",
    )
"#;
