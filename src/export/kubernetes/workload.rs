//! Deployment and Service for agents, Job for tasks.

use super::{
    config_map_name, hint_notes, labels, object_meta, path, secret_name, Hints, CONTAINER_PORT,
    SERVICE_PORT,
};
use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Generator, KindSpec};
use serde_json::{json, Value};

pub struct WorkloadGenerator;

impl Generator for WorkloadGenerator {
    fn name(&self) -> &'static str {
        "workload"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        match &ctx.spec {
            KindSpec::Agent(_) => Ok(vec![
                ExportArtifact::config(path("deployment.yaml"), serde_yaml::to_string(&deployment(ctx))?),
                ExportArtifact::config(path("service.yaml"), serde_yaml::to_string(&service(ctx))?),
            ]),
            KindSpec::Task(_) => Ok(vec![ExportArtifact::config(
                path("job.yaml"),
                serde_yaml::to_string(&job(ctx))?,
            )]),
            KindSpec::Workflow(_) => Ok(Vec::new()),
        }
    }

    fn notes(&self, ctx: &ExportContext<'_>) -> Vec<String> {
        hint_notes(ctx)
    }
}

fn security_context() -> Value {
    json!({
        "runAsNonRoot": true,
        "runAsUser": 10001,
        "allowPrivilegeEscalation": false,
        "readOnlyRootFilesystem": true,
        "capabilities": {"drop": ["ALL"]},
    })
}

fn resources() -> Value {
    json!({
        "requests": {"cpu": "250m", "memory": "256Mi"},
        "limits": {"cpu": "1", "memory": "1Gi"},
    })
}

fn env_from(ctx: &ExportContext<'_>) -> Value {
    json!([
        {"configMapRef": {"name": config_map_name(ctx)}},
        {"secretRef": {"name": secret_name(ctx)}},
    ])
}

fn probe(path: &str, initial_delay: u64) -> Value {
    json!({
        "httpGet": {"path": path, "port": "http"},
        "initialDelaySeconds": initial_delay,
        "periodSeconds": 10,
    })
}

fn deployment(ctx: &ExportContext<'_>) -> Value {
    let hints = Hints::from_context(ctx);
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": object_meta(ctx, ctx.name()),
        "spec": {
            "replicas": hints.replicas,
            "selector": {"matchLabels": labels(ctx)},
            "template": {
                "metadata": {"labels": labels(ctx)},
                "spec": {
                    "containers": [{
                        "name": "agent",
                        "image": hints.image,
                        "ports": [{"name": "http", "containerPort": CONTAINER_PORT, "protocol": "TCP"}],
                        "envFrom": env_from(ctx),
                        "livenessProbe": probe("/health", 5),
                        "readinessProbe": probe("/ready", 10),
                        "resources": resources(),
                        "securityContext": security_context(),
                    }]
                }
            }
        }
    })
}

fn service(ctx: &ExportContext<'_>) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": object_meta(ctx, ctx.name()),
        "spec": {
            "type": "ClusterIP",
            "selector": labels(ctx),
            "ports": [{"name": "http", "port": SERVICE_PORT, "targetPort": "http", "protocol": "TCP"}],
        }
    })
}

fn job(ctx: &ExportContext<'_>) -> Value {
    let hints = Hints::from_context(ctx);
    let task = ctx.task();
    // Job retries count failures after the first attempt.
    let backoff = task
        .and_then(|t| t.retry_policy.as_ref())
        .and_then(|r| r.max_attempts)
        .map_or(0, |attempts| attempts.saturating_sub(1));

    let mut spec = json!({
        "backoffLimit": backoff,
        "template": {
            "metadata": {"labels": labels(ctx)},
            "spec": {
                "restartPolicy": "Never",
                "containers": [{
                    "name": "task",
                    "image": hints.image,
                    "envFrom": env_from(ctx),
                    "resources": resources(),
                    "securityContext": security_context(),
                }]
            }
        }
    });
    if let Some(timeout) = task.and_then(|t| t.timeout_seconds) {
        spec["activeDeadlineSeconds"] = json!(timeout);
    }

    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": object_meta(ctx, ctx.name()),
        "spec": spec,
    })
}
