//! `export-metadata.json`: the last artifact of every export.

use super::artifact::{ArtifactKind, ExportArtifact};
use super::digest::{bundle_digest, content_hash, to_hex};
use super::ExportContext;
use crate::error::PipelineError;
use chrono::SecondsFormat;
use serde::Serialize;

pub const METADATA_FILE: &str = "export-metadata.json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportMetadata<'a> {
    target: &'a str,
    format_version: String,
    manifest: &'a str,
    kind: &'a str,
    schema_version: String,
    degraded_features: Vec<String>,
    bundle_digest: String,
    artifacts: Vec<ArtifactEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<String>,
}

#[derive(Serialize)]
struct ArtifactEntry<'a> {
    path: &'a str,
    kind: ArtifactKind,
    blake3: String,
}

/// Build the metadata artifact for `artifacts`, which must be sorted by path.
pub(super) fn metadata_artifact(
    ctx: &ExportContext<'_>,
    artifacts: &[ExportArtifact],
) -> Result<ExportArtifact, PipelineError> {
    let metadata = ExportMetadata {
        target: ctx.target.name,
        format_version: ctx.target.format_version.to_string(),
        manifest: ctx.name(),
        kind: ctx.kind().as_str(),
        schema_version: ctx.target.schema_version.to_string(),
        degraded_features: ctx.degraded.iter().map(|f| f.name()).collect(),
        bundle_digest: to_hex(&bundle_digest(artifacts)),
        artifacts: artifacts
            .iter()
            .map(|artifact| ArtifactEntry {
                path: &artifact.path,
                kind: artifact.kind,
                blake3: to_hex(&content_hash(artifact.content.as_bytes())),
            })
            .collect(),
        generated_at: ctx
            .options
            .generated_at
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
    };
    let mut content = serde_json::to_string_pretty(&metadata)?;
    content.push('\n');
    Ok(ExportArtifact::new(METADATA_FILE, ArtifactKind::Metadata, content))
}
