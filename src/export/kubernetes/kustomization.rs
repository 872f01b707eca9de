use super::{labels, path, resource_files, Hints};
use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Generator};
use serde_json::json;

pub struct KustomizationGenerator;

impl Generator for KustomizationGenerator {
    fn name(&self) -> &'static str {
        "kustomization"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let hints = Hints::from_context(ctx);
        let kustomization = json!({
            "apiVersion": "kustomize.config.k8s.io/v1beta1",
            "kind": "Kustomization",
            "namespace": hints.namespace,
            "resources": resource_files(ctx.kind()),
            "labels": [{"pairs": labels(ctx), "includeSelectors": false}],
        });
        Ok(vec![ExportArtifact::config(
            path("kustomization.yaml"),
            serde_yaml::to_string(&kustomization)?,
        )])
    }
}
