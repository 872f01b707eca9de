//! ConfigMap with runtime settings and a Secret that names the credentials to supply.

use super::{config_map_name, object_meta, path, secret_name, CONTAINER_PORT};
use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Feature, Generator, KindSpec, MemoryBackend};
use crate::manifest::AgentSpec;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

pub struct ConfigGenerator;

impl Generator for ConfigGenerator {
    fn name(&self) -> &'static str {
        "config"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let configmap = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": object_meta(ctx, &config_map_name(ctx)),
            "data": settings(ctx)?,
        });

        let keys: Map<String, Value> = secret_keys(ctx)
            .into_iter()
            .map(|key| (key, Value::String(String::new())))
            .collect();
        let mut meta = object_meta(ctx, &secret_name(ctx));
        meta["annotations"] = json!({"agentspec.io/values": "supplied at deploy time"});
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "Opaque",
            "metadata": meta,
            "stringData": keys,
        });

        Ok(vec![
            ExportArtifact::config(path("configmap.yaml"), serde_yaml::to_string(&configmap)?),
            ExportArtifact::config(path("secret.yaml"), serde_yaml::to_string(&secret)?),
        ])
    }
}

/// Environment handed to the container through the ConfigMap.
pub(crate) fn settings(ctx: &ExportContext<'_>) -> Result<BTreeMap<String, String>, PipelineError> {
    let mut data = BTreeMap::new();
    match &ctx.spec {
        KindSpec::Agent(agent) => agent_settings(ctx, agent, &mut data)?,
        KindSpec::Task(task) => {
            data.insert("TASK_NAME".to_string(), ctx.name().to_string());
            data.insert("TASK_STEPS".to_string(), serde_json::to_string(&task.steps)?);
            if let Some(timeout) = task.timeout_seconds {
                data.insert("TASK_TIMEOUT_SECONDS".to_string(), timeout.to_string());
            }
            if let Some(attempts) = task.retry_policy.as_ref().and_then(|r| r.max_attempts) {
                data.insert("TASK_MAX_ATTEMPTS".to_string(), attempts.to_string());
            }
        }
        KindSpec::Workflow(workflow) => {
            data.insert("WORKFLOW_STEPS".to_string(), serde_json::to_string(&workflow.steps)?);
        }
    }
    Ok(data)
}

fn agent_settings(
    ctx: &ExportContext<'_>,
    agent: &AgentSpec,
    data: &mut BTreeMap<String, String>,
) -> Result<(), PipelineError> {
    let mut put = |key: &str, value: String| {
        data.insert(key.to_string(), value);
    };
    put("AGENT_NAME", ctx.name().to_string());
    put("AGENT_ROLE", agent.role.clone());
    put("PORT", CONTAINER_PORT.to_string());
    put("LLM_PROVIDER", agent.llm.provider.as_str().to_string());
    put("LLM_MODEL", agent.llm.model.clone());
    if let Some(t) = agent.llm.temperature {
        put("LLM_TEMPERATURE", t.to_string());
    }
    if let Some(m) = agent.llm.max_tokens {
        put("LLM_MAX_TOKENS", m.to_string());
    }
    if !agent.llm.fallback_models.is_empty() && !ctx.is_degraded(&Feature::FallbackModels) {
        let models: Vec<String> = agent
            .llm
            .fallback_models
            .iter()
            .map(|f| format!("{}/{}", f.provider.as_str(), f.model))
            .collect();
        put("LLM_FALLBACK_MODELS", models.join(","));
    }

    let tools: Vec<&str> = ctx.active_tools().iter().map(|t| t.name.as_str()).collect();
    put("AGENT_TOOLS", serde_json::to_string(&tools)?);

    if let Some(budget) = agent.budget() {
        if let Some(v) = budget.max_tokens_per_day {
            put("AGENT_MAX_TOKENS_PER_DAY", v.to_string());
        }
        if let Some(v) = budget.max_tokens_per_request {
            put("AGENT_MAX_TOKENS_PER_REQUEST", v.to_string());
        }
        if let Some(v) = budget.max_cost_per_day {
            put("AGENT_MAX_COST_PER_DAY", v.to_string());
        }
    }
    if let Some(limits) = agent.limits() {
        if let Some(v) = limits.max_turns {
            put("AGENT_MAX_TURNS", v.to_string());
        }
        if let Some(v) = limits.timeout_seconds {
            put("AGENT_TIMEOUT_SECONDS", v.to_string());
        }
        if let Some(v) = limits.max_concurrent_requests {
            put("AGENT_MAX_CONCURRENT_REQUESTS", v.to_string());
        }
    }
    if let Some(rpm) = agent
        .safety
        .as_ref()
        .and_then(|s| s.rate_limits.as_ref())
        .and_then(|r| r.requests_per_minute)
    {
        put("AGENT_REQUESTS_PER_MINUTE", rpm.to_string());
    }

    if let (Some(state), Some(backend)) = (ctx.active_state(), ctx.memory_backend()) {
        put("STATE_STRATEGY", state.strategy().as_str().to_string());
        if let Some(window) = state.window {
            put("STATE_WINDOW", window.to_string());
        }
        if let Some(ttl) = state.ttl_seconds {
            put("STATE_TTL_SECONDS", ttl.to_string());
        }
        put("MEMORY_BACKEND", backend.as_str().to_string());
    }

    if ctx.features.contains(&Feature::PiiRedaction) && !ctx.is_degraded(&Feature::PiiRedaction) {
        put("PII_REDACTION", "true".to_string());
    }
    if !ctx.is_degraded(&Feature::HumanApproval) {
        if let Some(autonomy) = agent.autonomy.as_ref().filter(|a| !a.require_approval.is_empty()) {
            put("REQUIRE_APPROVAL", autonomy.require_approval.join(","));
        }
    }
    Ok(())
}

/// Credential names the Secret declares. Values are never generated.
pub(crate) fn secret_keys(ctx: &ExportContext<'_>) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    let Some(agent) = ctx.agent() else {
        return keys;
    };
    let mut providers = vec![agent.llm.provider];
    if !ctx.is_degraded(&Feature::FallbackModels) {
        providers.extend(agent.llm.fallback_models.iter().map(|f| f.provider));
    }
    keys.extend(providers.iter().filter_map(|p| p.api_key_env()).map(str::to_string));
    match ctx.memory_backend() {
        Some(MemoryBackend::KeyValue) => {
            keys.insert("REDIS_URL".to_string());
        }
        Some(MemoryBackend::Relational) => {
            keys.insert("DATABASE_URL".to_string());
        }
        _ => {}
    }
    keys
}
