//! `tools.py`: one LangChain tool per manifest tool.

use crate::error::PipelineError;
use crate::export::python::{annotation, identifier, string_literal};
use crate::export::{ExportArtifact, ExportContext, Generator};
use crate::manifest::{ToolSpec, ToolType};
use serde_json::Value;

pub struct ToolsGenerator;

impl Generator for ToolsGenerator {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let tools = ctx.active_tools();
        let mut out = String::new();
        out.push_str(&format!(
            "\"\"\"Tool bindings for {}. Generated by agentspec; edit the function bodies, not the signatures.\"\"\"\n\n",
            ctx.name()
        ));
        out.push_str("from __future__ import annotations\n\n");
        out.push_str("import os\nfrom typing import Any, Optional\n\n");
        out.push_str("import httpx\nfrom langchain_core.tools import tool\n\n");
        out.push_str("HTTP_TIMEOUT = float(os.environ.get(\"TOOL_HTTP_TIMEOUT\", \"30\"))\n\n");

        if tools.iter().any(|t| t.tool_type == ToolType::Mcp) {
            out.push_str(MCP_HELPER);
        }

        for tool in &tools {
            out.push('\n');
            out.push_str(&render_tool(tool));
        }

        let names: Vec<String> = tools.iter().map(|t| identifier(&t.name)).collect();
        out.push_str(&format!("\n\nTOOLS = [{}]\n", names.join(", ")));

        Ok(vec![ExportArtifact::source("tools.py", out)])
    }
}

const MCP_HELPER: &str = r#"
def _call_mcp(server: str, name: str, arguments: dict[str, Any]) -> str:
    url = os.environ.get("MCP_SERVER_" + server.upper().replace("-", "_") + "_URL", server)
    payload = {
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments},
    }
    response = httpx.post(url, json=payload, timeout=HTTP_TIMEOUT)
    response.raise_for_status()
    return response.text

"#;

/// One `(name, annotation, required)` per parameter; required ones first in
/// declaration order, then optional ones sorted by name.
pub(crate) fn parameters(tool: &ToolSpec) -> Vec<(String, &'static str, bool)> {
    let Some(schema) = &tool.parameters else {
        return vec![("query".to_string(), "str", true)];
    };
    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = properties else {
        return vec![("query".to_string(), "str", true)];
    };
    let mut params: Vec<(String, &'static str, bool)> = required
        .iter()
        .filter_map(|name| properties.get(*name).map(|s| (name.to_string(), annotation(s), true)))
        .collect();
    for (name, prop) in properties {
        if !required.contains(&name.as_str()) {
            params.push((name.clone(), annotation(prop), false));
        }
    }
    params
}

fn render_tool(tool: &ToolSpec) -> String {
    let fn_name = identifier(&tool.name);
    let params = parameters(tool);
    let signature: Vec<String> = params
        .iter()
        .map(|(name, ty, required)| {
            let arg = identifier(name);
            if *required {
                format!("{}: {}", arg, ty)
            } else {
                format!("{}: Optional[{}] = None", arg, ty)
            }
        })
        .collect();
    let arguments: Vec<String> = params
        .iter()
        .map(|(name, _, _)| format!("{}: {}", string_literal(name), identifier(name)))
        .collect();
    let description = tool
        .description
        .clone()
        .unwrap_or_else(|| format!("Call the {} tool.", tool.name));

    let mut out = format!(
        "@tool\ndef {}({}) -> str:\n    {}\n",
        fn_name,
        signature.join(", "),
        string_literal(&description)
    );
    out.push_str(&format!(
        "    arguments = {{k: v for k, v in {{{}}}.items() if v is not None}}\n",
        arguments.join(", ")
    ));

    match tool.tool_type {
        ToolType::Http => {
            let method = tool.method.as_deref().unwrap_or("POST");
            let endpoint = tool.endpoint.as_deref().unwrap_or("");
            let body = if method == "GET" || method == "DELETE" { "params" } else { "json" };
            out.push_str(&format!(
                "    response = httpx.request({}, {}, {}=arguments, timeout=HTTP_TIMEOUT)\n",
                string_literal(method),
                string_literal(endpoint),
                body
            ));
            out.push_str("    response.raise_for_status()\n    return response.text\n");
        }
        ToolType::Mcp => {
            let server = tool.server.as_deref().unwrap_or(&tool.name);
            out.push_str(&format!(
                "    return _call_mcp({}, {}, arguments)\n",
                string_literal(server),
                string_literal(&tool.name)
            ));
        }
        ToolType::Retrieval => {
            let env = format!("{}_RETRIEVER_URL", identifier(&tool.name).to_uppercase());
            out.push_str(&format!(
                "    response = httpx.post(os.environ[{}], json=arguments, timeout=HTTP_TIMEOUT)\n",
                string_literal(&env)
            ));
            out.push_str("    response.raise_for_status()\n    return response.text\n");
        }
        ToolType::Function | ToolType::CodeInterpreter => {
            out.push_str(&format!(
                "    raise NotImplementedError({})\n",
                string_literal(&format!("implement tool '{}'", tool.name))
            ));
        }
    }
    out
}
