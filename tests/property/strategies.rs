//! Manifest generators
//!
//! `agent` yields schema-valid 0.4.0 agents restricted to fields that survive a trip
//! to 0.3.0 and back. `broken_agent` applies one or two known defects to such an agent.

use agentspec::manifest::Manifest;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

pub const PROVIDERS: &[&str] = &[
    "anthropic", "openai", "google", "azure", "bedrock", "groq", "mistral", "cohere", "ollama",
];

const TOOL_TYPES: &[&str] = &["function", "mcp", "http"];

const STATE_STRATEGIES: &[&str] = &["buffer", "window", "summary"];

pub fn manifest(document: Value) -> Manifest {
    Manifest::from_value(document).unwrap()
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

fn provider() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PROVIDERS)
}

fn tool(idx: usize) -> impl Strategy<Value = Value> {
    (prop::sample::select(TOOL_TYPES), "[a-z]{1,12}").prop_map(
        move |(tool_type, base)| {
            let mut tool = Map::new();
            tool.insert("type".to_string(), json!(tool_type));
            tool.insert("name".to_string(), json!(format!("{}_{}", base, idx)));
            match tool_type {
                "http" => {
                    tool.insert("endpoint".to_string(), json!(format!("https://{}.example.com", base)));
                }
                "mcp" => {
                    tool.insert("server".to_string(), json!(format!("{}-server", base)));
                }
                _ => {}
            }
            Value::Object(tool)
        },
    )
}

fn tools() -> impl Strategy<Value = Vec<Value>> {
    (0usize..4).prop_flat_map(|count| (0..count).map(tool).collect::<Vec<_>>())
}

fn state() -> impl Strategy<Value = Value> {
    (prop::sample::select(STATE_STRATEGIES), 1u32..100)
        .prop_map(|(strategy, window)| json!({"strategy": strategy, "window": window}))
}

fn policies() -> impl Strategy<Value = Option<Value>> {
    (
        prop::option::of(1u64..1_000_000),
        prop::option::of(1u32..50),
        prop::option::of(1u32..600),
    )
        .prop_map(|(tokens, turns, timeout)| {
            let mut policies = Map::new();
            if let Some(tokens) = tokens {
                policies.insert("budget".to_string(), json!({"maxTokensPerDay": tokens}));
            }
            let mut limits = Map::new();
            if let Some(turns) = turns {
                limits.insert("maxTurns".to_string(), json!(turns));
            }
            if let Some(timeout) = timeout {
                limits.insert("timeoutSeconds".to_string(), json!(timeout));
            }
            if !limits.is_empty() {
                policies.insert("limits".to_string(), Value::Object(limits));
            }
            (!policies.is_empty()).then_some(Value::Object(policies))
        })
}

/// Schema-valid 0.4.0 agent without 0.4.0-only features.
pub fn agent() -> impl Strategy<Value = Value> {
    (
        name(),
        "[A-Za-z][A-Za-z ,.]{0,60}",
        provider(),
        "[a-z][a-z0-9.-]{0,20}",
        prop::option::of(0u32..=20),
        tools(),
        prop::option::of(state()),
        policies(),
    )
        .prop_map(|(name, role, provider, model, temperature, tools, state, policies)| {
            let mut llm = Map::new();
            llm.insert("provider".to_string(), json!(provider));
            llm.insert("model".to_string(), json!(model));
            if let Some(tenths) = temperature {
                llm.insert("temperature".to_string(), json!(f64::from(tenths) / 10.0));
            }

            let mut spec = Map::new();
            spec.insert("role".to_string(), json!(role));
            spec.insert("llm".to_string(), Value::Object(llm));
            if !tools.is_empty() {
                spec.insert("tools".to_string(), Value::Array(tools));
            }
            if let Some(state) = state {
                spec.insert("state".to_string(), state);
            }
            if let Some(policies) = policies {
                spec.insert("policies".to_string(), policies);
            }

            json!({
                "apiVersion": "agentspec/v0.4.0",
                "kind": "Agent",
                "metadata": {"name": name},
                "spec": spec,
            })
        })
}

/// A provider value outside the enum.
pub fn provider_typo() -> impl Strategy<Value = String> {
    "[a-z]{2,12}".prop_filter("must not be a provider", |raw| !PROVIDERS.contains(&raw.as_str()))
}

fn break_document(mut document: Value, defect: usize, typo: &str) -> Value {
    match defect {
        0 => {
            if let Some(spec) = document["spec"].as_object_mut() {
                spec.remove("role");
            }
        }
        1 => document["spec"]["llm"]["temperature"] = json!(5.0),
        2 => document["spec"]["llm"]["provider"] = json!(typo),
        3 => document["spec"]["unexpected"] = json!(true),
        4 => document["metadata"]["name"] = json!("Not_A_Name"),
        _ => document["spec"]["llm"]["model"] = json!(42),
    }
    document
}

/// A generated agent with one or two defects applied.
pub fn broken_agent() -> impl Strategy<Value = Value> {
    (agent(), prop::collection::btree_set(0usize..6, 1..3), provider_typo()).prop_map(
        |(document, defects, typo)| {
            defects
                .into_iter()
                .fold(document, |doc, defect| break_document(doc, defect, &typo))
        },
    )
}
