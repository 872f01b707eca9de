//! `interface.json`: what the deployed workload exposes, for tooling that wires it up.

use super::{config_map_name, path, secret_keys, secret_name, Hints, CONTAINER_PORT, SERVICE_PORT};
use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Generator};
use crate::manifest::ManifestKind;
use serde_json::{json, Value};

pub struct InterfaceGenerator;

impl Generator for InterfaceGenerator {
    fn name(&self) -> &'static str {
        "interface"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let hints = Hints::from_context(ctx);
        let (workload, ports, probes, endpoints) = match ctx.kind() {
            ManifestKind::Task => ("Job", json!([]), Value::Null, json!([])),
            _ => (
                "Deployment",
                json!([{
                    "name": "http",
                    "port": SERVICE_PORT,
                    "targetPort": CONTAINER_PORT,
                    "protocol": "TCP",
                }]),
                json!({"liveness": "/health", "readiness": "/ready"}),
                json!([
                    {"method": "POST", "path": "/chat"},
                    {"method": "GET", "path": "/health"},
                    {"method": "GET", "path": "/ready"},
                ]),
            ),
        };
        let interface = json!({
            "name": ctx.name(),
            "kind": ctx.kind().as_str(),
            "formatVersion": ctx.target.format_version.to_string(),
            "namespace": hints.namespace,
            "image": hints.image,
            "workload": workload,
            "ports": ports,
            "probes": probes,
            "endpoints": endpoints,
            "configMap": config_map_name(ctx),
            "secret": {"name": secret_name(ctx), "keys": secret_keys(ctx)},
        });
        let mut content = serde_json::to_string_pretty(&interface)?;
        content.push('\n');
        Ok(vec![ExportArtifact::specification(path("interface.json"), content)])
    }
}
