//! Registered migration steps between adjacent schema versions.

use super::edit::DocumentEdit;
use super::{DeprecationAction, MigrationStep};
use semver::Version;
use serde_json::{json, Map, Value};

/// One hop in the version graph.
pub struct Step {
    from: Version,
    to: Version,
    rewrite: fn(&mut DocumentEdit),
}

impl Step {
    pub fn new(from: Version, to: Version, rewrite: fn(&mut DocumentEdit)) -> Self {
        Self { from, to, rewrite }
    }
}

impl MigrationStep for Step {
    fn from_version(&self) -> &Version {
        &self.from
    }

    fn to_version(&self) -> &Version {
        &self.to
    }

    fn rewrite(&self, edit: &mut DocumentEdit) {
        (self.rewrite)(edit)
    }
}

/// Steps shipped with the crate.
pub fn builtin() -> Vec<Step> {
    let v02 = Version::new(0, 2, 0);
    let v03 = Version::new(0, 3, 0);
    let v04 = Version::new(0, 4, 0);
    vec![
        Step::new(v02.clone(), v03.clone(), memory_to_state),
        Step::new(v03.clone(), v02, state_to_memory),
        Step::new(v03.clone(), v04.clone(), constraints_to_policies),
        Step::new(v04, v03, policies_to_constraints),
    ]
}

/// 0.2.0 → 0.3.0
fn memory_to_state(edit: &mut DocumentEdit) {
    if let Some(memory) = edit.take("spec.memory") {
        let mut state = Map::new();
        state.insert("enabled".to_string(), Value::Bool(true));
        if let Some(strategy) = memory.get("type") {
            state.insert("strategy".to_string(), strategy.clone());
        }
        if let Some(window) = memory.get("maxMessages") {
            state.insert("window".to_string(), window.clone());
        }
        edit.insert("spec.state", Value::Object(state));
        edit.note(
            "spec.memory",
            DeprecationAction::Converted,
            "memory {type, maxMessages} became state {enabled, strategy, window}",
        );
    }

    if let Some(flag) = edit.take("spec.autonomy.approvalRequired") {
        let actions = if flag.as_bool() == Some(true) { json!(["*"]) } else { json!([]) };
        edit.insert("spec.autonomy.requireApproval", actions);
        edit.note(
            "spec.autonomy.approvalRequired",
            DeprecationAction::Converted,
            "approvalRequired flag became the requireApproval action list",
        );
    }
}

/// 0.3.0 → 0.2.0
fn state_to_memory(edit: &mut DocumentEdit) {
    if let Some(state) = edit.take("spec.state") {
        if state.get("enabled").and_then(Value::as_bool) == Some(false) {
            edit.note(
                "spec.state",
                DeprecationAction::Dropped,
                "disabled state has no 0.2.0 representation and was removed",
            );
        } else {
            let mut memory = Map::new();
            if let Some(strategy) = state.get("strategy") {
                memory.insert("type".to_string(), strategy.clone());
            }
            if let Some(window) = state.get("window") {
                memory.insert("maxMessages".to_string(), window.clone());
            }
            if let Some(ttl) = state.get("ttlSeconds") {
                edit.note(
                    "spec.state.ttlSeconds",
                    DeprecationAction::Dropped,
                    format!("state expiry of {}s is not expressible in 0.2.0", ttl),
                );
            }
            edit.insert("spec.memory", Value::Object(memory));
            edit.note(
                "spec.state",
                DeprecationAction::Converted,
                "state {strategy, window} became memory {type, maxMessages}",
            );
        }
    }

    if let Some(actions) = edit.take("spec.autonomy.requireApproval") {
        let list: Vec<&str> = actions
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let message = match list.as_slice() {
            [] => "empty requireApproval list became approvalRequired: false".to_string(),
            ["*"] => "requireApproval [\"*\"] became approvalRequired: true".to_string(),
            specific => format!(
                "approval for specific actions ({}) widened to approvalRequired: true",
                specific.join(", ")
            ),
        };
        edit.insert("spec.autonomy.approvalRequired", Value::Bool(!list.is_empty()));
        edit.note("spec.autonomy.requireApproval", DeprecationAction::Converted, message);
    }

    if let Some(safety) = edit.take("spec.safety") {
        let fields = safety
            .as_object()
            .map(|s| s.keys().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        edit.note(
            "spec.safety",
            DeprecationAction::Dropped,
            format!("0.2.0 has no safety block; removed fields: {}", fields),
        );
    }
}

/// 0.3.0 → 0.4.0
fn constraints_to_policies(edit: &mut DocumentEdit) {
    if let Some(constraints) = edit.take("spec.constraints") {
        if let Some(cost) = constraints.get("cost") {
            edit.insert("spec.policies.budget", cost.clone());
            edit.note(
                "spec.constraints.cost",
                DeprecationAction::Renamed,
                "moved to spec.policies.budget",
            );
        }
        if let Some(performance) = constraints.get("performance") {
            edit.insert("spec.policies.limits", performance.clone());
            edit.note(
                "spec.constraints.performance",
                DeprecationAction::Renamed,
                "moved to spec.policies.limits",
            );
        }
    }

    if let Some(turns) = edit.take("spec.safety.maxTurns") {
        edit.insert("spec.policies.limits.maxTurns", turns);
        edit.remove_if_empty("spec.safety");
        edit.note(
            "spec.safety.maxTurns",
            DeprecationAction::Renamed,
            "moved to spec.policies.limits.maxTurns",
        );
    }

    rename_tool_type(edit, "api", "http");
}

/// 0.4.0 → 0.3.0
fn policies_to_constraints(edit: &mut DocumentEdit) {
    if let Some(policies) = edit.take("spec.policies") {
        if let Some(budget) = policies.get("budget") {
            edit.insert("spec.constraints.cost", budget.clone());
            edit.note(
                "spec.policies.budget",
                DeprecationAction::Renamed,
                "moved to spec.constraints.cost",
            );
        }
        if let Some(limits) = policies.get("limits").and_then(Value::as_object) {
            let mut performance = limits.clone();
            let turns = performance.remove("maxTurns");
            if let Some(turns) = &turns {
                edit.insert("spec.safety.maxTurns", turns.clone());
                edit.note(
                    "spec.policies.limits.maxTurns",
                    DeprecationAction::Renamed,
                    "moved to spec.safety.maxTurns",
                );
            }
            if !performance.is_empty() || turns.is_none() {
                edit.insert("spec.constraints.performance", Value::Object(performance));
                edit.note(
                    "spec.policies.limits",
                    DeprecationAction::Renamed,
                    "moved to spec.constraints.performance",
                );
            }
        }
    }

    if let Some(fallbacks) = edit.take("spec.llm.fallbackModels") {
        let count = fallbacks.as_array().map_or(0, Vec::len);
        edit.note(
            "spec.llm.fallbackModels",
            DeprecationAction::Dropped,
            format!("{} fallback model(s) removed; 0.3.0 has no fallback chain", count),
        );
    }

    // Both helpers report indices into the incoming tool list.
    rename_tool_type(edit, "http", "api");
    drop_tools_of_type(edit, "retrieval");
}

fn rename_tool_type(edit: &mut DocumentEdit, from: &str, to: &str) {
    let mut renamed = Vec::new();
    if let Some(tools) = edit.get_mut("spec.tools").and_then(Value::as_array_mut) {
        for (idx, tool) in tools.iter_mut().enumerate() {
            if let Some(tool_type) = tool.get_mut("type") {
                if tool_type.as_str() == Some(from) {
                    *tool_type = Value::String(to.to_string());
                    renamed.push(idx);
                }
            }
        }
    }
    for idx in renamed {
        edit.note(
            format!("spec.tools[{}].type", idx),
            DeprecationAction::Renamed,
            format!("tool type '{}' is called '{}'", from, to),
        );
    }
}

fn drop_tools_of_type(edit: &mut DocumentEdit, tool_type: &str) {
    let mut dropped = Vec::new();
    if let Some(tools) = edit.get_mut("spec.tools").and_then(Value::as_array_mut) {
        let mut idx = 0;
        tools.retain(|tool| {
            let keep = tool.get("type").and_then(Value::as_str) != Some(tool_type);
            if !keep {
                let name = tool.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
                dropped.push((idx, name.to_string()));
            }
            idx += 1;
            keep
        });
    }
    for (idx, name) in dropped {
        edit.note(
            format!("spec.tools[{}]", idx),
            DeprecationAction::Dropped,
            format!("tool '{}' of type '{}' has no equivalent in the target version", name, tool_type),
        );
    }
}
