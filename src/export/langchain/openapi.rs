//! `openapi.yaml`: OpenAPI 3 description of the generated service.

use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Generator};
use serde_json::{json, Value};

pub struct OpenApiGenerator;

impl Generator for OpenApiGenerator {
    fn name(&self) -> &'static str {
        "openapi"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let document = document(ctx);
        let content = serde_yaml::to_string(&document)?;
        Ok(vec![ExportArtifact::specification("openapi.yaml", content)])
    }
}

fn document(ctx: &ExportContext<'_>) -> Value {
    let tools: Vec<Value> = ctx
        .active_tools()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "type": tool.tool_type.as_str(),
                "description": tool.description.clone().unwrap_or_default(),
            })
        })
        .collect();

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": ctx.name(),
            "version": ctx.metadata.version.clone().unwrap_or_else(|| "0.1.0".to_string()),
            "description": ctx.metadata.description.clone().unwrap_or_default(),
            "x-agentspec": {
                "target": ctx.target.name,
                "formatVersion": ctx.target.format_version.to_string(),
                "tools": tools,
            }
        },
        "paths": {
            "/chat": {
                "post": {
                    "operationId": "chat",
                    "summary": "Send a message to the agent",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ChatRequest"}}}
                    },
                    "responses": {
                        "200": {
                            "description": "Agent reply",
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ChatResponse"}}}
                        },
                        "429": {"description": "Rate limit or token budget exceeded"}
                    }
                }
            },
            "/health": {
                "get": {
                    "operationId": "health",
                    "summary": "Liveness probe",
                    "responses": {"200": {"description": "Process is alive"}}
                }
            },
            "/ready": {
                "get": {
                    "operationId": "ready",
                    "summary": "Readiness probe",
                    "responses": {
                        "200": {"description": "Agent is built and can serve"},
                        "503": {"description": "Agent failed to initialize"}
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "ChatRequest": {
                    "type": "object",
                    "required": ["message"],
                    "properties": {
                        "message": {"type": "string", "minLength": 1},
                        "session_id": {"type": "string", "default": "default"}
                    }
                },
                "ChatResponse": {
                    "type": "object",
                    "required": ["response", "session_id"],
                    "properties": {
                        "response": {"type": "string"},
                        "session_id": {"type": "string"}
                    }
                }
            }
        }
    })
}
