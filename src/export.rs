//! Target Exporters
//!
//! An exporter compiles a validated manifest into files for one target platform. All
//! exporters share one driver: kind check, feature policy resolution, independent
//! sub-generators, a warning artifact for degraded features, optional tests, then a
//! metadata artifact with content hashes. Given the same manifest and options the
//! driver produces byte-identical output; the only variable field is `generatedAt` in
//! the metadata, and only when the caller supplies a timestamp.

mod artifact;
mod digest;
mod features;
pub mod kubernetes;
pub mod langchain;
mod metadata;
pub(crate) mod python;
mod registry;

pub use artifact::{ArtifactKind, ExportArtifact};
pub use digest::{bundle_digest, content_hash, to_hex, Digest};
pub use features::{Feature, FeaturePolicy, FeatureSet};
pub use metadata::METADATA_FILE;
pub use registry::ExporterRegistry;

use crate::error::PipelineError;
use crate::manifest::{
    AgentSpec, Manifest, ManifestKind, Metadata, StatePolicy, StateStrategy, TaskSpec, ToolSpec,
    WorkflowSpec,
};
use crate::testgen::{self, TestProfile, TestSelection};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Name of the warning artifact written when features were degraded.
pub const WARNINGS_FILE: &str = "EXPORT_WARNINGS.md";

/// Descriptor of a target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub name: &'static str,
    pub description: &'static str,
    pub kinds: &'static [ManifestKind],
    /// Version of the generated artifact layout, independent of the schema version.
    pub format_version: Version,
    /// Schema version the exporter reads.
    pub schema_version: Version,
    pub test_profile: TestProfile,
}

impl ExportTarget {
    pub fn accepts(&self, kind: ManifestKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// State backend used by generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryBackend {
    #[default]
    InMemory,
    Summarizing,
    KeyValue,
    Relational,
}

impl MemoryBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryBackend::InMemory => "in-memory",
            MemoryBackend::Summarizing => "summarizing",
            MemoryBackend::KeyValue => "key-value",
            MemoryBackend::Relational => "relational",
        }
    }
}

impl FromStr for MemoryBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "in-memory" | "memory" => Ok(MemoryBackend::InMemory),
            "summarizing" | "summary" => Ok(MemoryBackend::Summarizing),
            "key-value" | "kv" | "redis" => Ok(MemoryBackend::KeyValue),
            "relational" | "sql" | "postgres" => Ok(MemoryBackend::Relational),
            other => Err(format!(
                "unknown memory backend '{}' (expected in-memory, summarizing, key-value or relational)",
                other
            )),
        }
    }
}

impl fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub memory_backend: MemoryBackend,
    /// Test categories to generate; `None` skips test generation.
    pub tests: Option<TestSelection>,
    /// Per-feature replacements for the exporter's declared policies, keyed by
    /// feature name (`tool:code_interpreter`).
    pub policy_overrides: BTreeMap<String, FeaturePolicy>,
    /// Recorded in the metadata artifact when set.
    pub generated_at: Option<DateTime<Utc>>,
}

/// Why an exporter refused a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub target: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub origins: Vec<String>,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)?;
        if !self.origins.is_empty() {
            write!(f, " (used by {})", self.origins.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResult {
    Exported(Vec<ExportArtifact>),
    Rejected(Rejection),
}

/// Outcome of checking a manifest's kind and features against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    Full,
    /// Exportable with these features omitted.
    Degraded(Vec<Feature>),
    Rejected(Rejection),
}

/// Kind-specific part of a manifest, already deserialized.
#[derive(Debug, Clone)]
pub enum KindSpec {
    Agent(AgentSpec),
    Task(TaskSpec),
    Workflow(WorkflowSpec),
}

/// Everything a generator may read. Generators never write to it.
#[derive(Debug)]
pub struct ExportContext<'a> {
    pub manifest: &'a Manifest,
    pub target: &'a ExportTarget,
    pub options: &'a ExportOptions,
    pub metadata: Metadata,
    pub spec: KindSpec,
    pub features: FeatureSet,
    pub degraded: BTreeSet<Feature>,
}

impl<'a> ExportContext<'a> {
    pub fn new(
        manifest: &'a Manifest,
        target: &'a ExportTarget,
        options: &'a ExportOptions,
        degraded: BTreeSet<Feature>,
    ) -> Result<Self, PipelineError> {
        let kind = manifest
            .kind()
            .ok_or_else(|| PipelineError::Serialization("manifest has no valid kind".to_string()))?;
        let spec = match kind {
            ManifestKind::Agent => KindSpec::Agent(manifest.agent_spec()?),
            ManifestKind::Task => KindSpec::Task(manifest.task_spec()?),
            ManifestKind::Workflow => KindSpec::Workflow(manifest.workflow_spec()?),
        };
        Ok(Self {
            manifest,
            target,
            options,
            metadata: manifest.metadata()?,
            spec,
            features: FeatureSet::from_manifest(manifest),
            degraded,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn agent(&self) -> Option<&AgentSpec> {
        match &self.spec {
            KindSpec::Agent(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn task(&self) -> Option<&TaskSpec> {
        match &self.spec {
            KindSpec::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn is_degraded(&self, feature: &Feature) -> bool {
        self.degraded.contains(feature)
    }

    /// Agent tools whose type was not degraded away.
    pub fn active_tools(&self) -> Vec<&ToolSpec> {
        self.agent()
            .map(|agent| {
                agent
                    .tools
                    .iter()
                    .filter(|tool| !self.is_degraded(&Feature::tool(tool.tool_type.as_str())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Agent state policy, unless absent, disabled or degraded.
    pub fn active_state(&self) -> Option<&StatePolicy> {
        self.agent()
            .and_then(|agent| agent.active_state())
            .filter(|_| !self.is_degraded(&Feature::State))
    }

    /// Backend generated code keeps state in, or `None` for a stateless agent.
    pub fn memory_backend(&self) -> Option<MemoryBackend> {
        self.active_state().map(|_| self.options.memory_backend)
    }

    /// Export-wide notes about settings the generated code cannot honor as written.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let (Some(state), Some(backend)) = (self.active_state(), self.memory_backend()) {
            if state.strategy() == StateStrategy::Summary && backend != MemoryBackend::Summarizing {
                notes.push(format!(
                    "state strategy `summary` on memory backend `{}` keeps the most recent window without summarizing; export with memory backend `summarizing` to condense older turns",
                    backend
                ));
            }
        }
        notes
    }

    pub fn kind(&self) -> ManifestKind {
        match self.spec {
            KindSpec::Agent(_) => ManifestKind::Agent,
            KindSpec::Task(_) => ManifestKind::Task,
            KindSpec::Workflow(_) => ManifestKind::Workflow,
        }
    }
}

/// One independent piece of an exporter's output.
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Kinds this generator produces output for.
    fn applies_to(&self, kind: ManifestKind) -> bool {
        let _ = kind;
        true
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError>;

    /// Substitutions this generator made, listed in the warnings artifact.
    fn notes(&self, ctx: &ExportContext<'_>) -> Vec<String> {
        let _ = ctx;
        Vec::new()
    }
}

/// A target platform.
pub trait Exporter: Send + Sync {
    fn target(&self) -> &ExportTarget;

    /// Declared handling of a feature; anything not listed is supported.
    fn policy(&self, feature: &Feature) -> FeaturePolicy;

    fn generators(&self) -> &[Box<dyn Generator>];

    /// Check a manifest kind and feature set against this target.
    fn supports(
        &self,
        kind: Option<ManifestKind>,
        features: &FeatureSet,
        overrides: &BTreeMap<String, FeaturePolicy>,
    ) -> Support {
        let target = self.target();
        let kind_ok = kind.is_some_and(|k| target.accepts(k));
        if !kind_ok {
            let kind_name = kind.map_or("<missing>", |k| k.as_str());
            return Support::Rejected(Rejection {
                target: target.name.to_string(),
                reason: format!(
                    "kind {} is not supported (supported: {})",
                    kind_name,
                    target.kinds.iter().map(ManifestKind::as_str).collect::<Vec<_>>().join(", ")
                ),
                feature: None,
                origins: Vec::new(),
            });
        }

        let mut degraded = Vec::new();
        for (feature, origins) in features.iter() {
            let policy = overrides
                .get(&feature.name())
                .copied()
                .unwrap_or_else(|| self.policy(feature));
            match policy {
                FeaturePolicy::Supported => {}
                FeaturePolicy::Degrade => degraded.push(feature.clone()),
                FeaturePolicy::Reject => {
                    return Support::Rejected(Rejection {
                        target: target.name.to_string(),
                        reason: format!("feature '{}' is not supported", feature),
                        feature: Some(feature.name()),
                        origins: origins.to_vec(),
                    })
                }
            }
        }

        if degraded.is_empty() {
            Support::Full
        } else {
            Support::Degraded(degraded)
        }
    }

    fn export(&self, manifest: &Manifest, options: &ExportOptions) -> Result<ExportResult, PipelineError> {
        run(self, manifest, options)
    }
}

/// Shared export driver.
pub fn run<E: Exporter + ?Sized>(
    exporter: &E,
    manifest: &Manifest,
    options: &ExportOptions,
) -> Result<ExportResult, PipelineError> {
    let target = exporter.target();
    let name = manifest.display_name();

    if manifest.schema_version().as_ref() != Some(&target.schema_version) {
        return Ok(ExportResult::Rejected(Rejection {
            target: target.name.to_string(),
            reason: format!(
                "target reads schema {}, manifest declares {}",
                target.schema_version,
                manifest.api_version().unwrap_or("no apiVersion")
            ),
            feature: None,
            origins: Vec::new(),
        }));
    }

    let features = FeatureSet::from_manifest(manifest);
    let degraded: BTreeSet<Feature> =
        match exporter.supports(manifest.kind(), &features, &options.policy_overrides) {
            Support::Full => BTreeSet::new(),
            Support::Degraded(list) => list.into_iter().collect(),
            Support::Rejected(rejection) => {
                warn!(manifest = %name, target = target.name, reason = %rejection.reason, "Export rejected");
                return Ok(ExportResult::Rejected(rejection));
            }
        };

    let ctx = ExportContext::new(manifest, target, options, degraded)?;
    let mut artifacts = Vec::new();
    let mut notes = ctx.notes();
    for generator in exporter.generators() {
        if !generator.applies_to(ctx.kind()) {
            continue;
        }
        for note in generator.notes(&ctx) {
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
        let produced = generator.generate(&ctx)?;
        debug!(
            manifest = %name,
            target = target.name,
            generator = generator.name(),
            artifacts = produced.len(),
            "Generator finished"
        );
        artifacts.extend(produced);
    }

    if !ctx.degraded.is_empty() || !notes.is_empty() {
        for note in &notes {
            warn!(manifest = %name, target = target.name, note = %note, "Export note");
        }
        artifacts.push(warnings_artifact(&ctx, &notes));
    }

    if let Some(selection) = &options.tests {
        artifacts.extend(testgen::generate_tests(&ctx, selection)?);
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    if let Some(pair) = artifacts.windows(2).find(|w| w[0].path == w[1].path) {
        return Err(PipelineError::Serialization(format!(
            "two generators produced '{}'",
            pair[0].path
        )));
    }

    artifacts.push(metadata::metadata_artifact(&ctx, &artifacts)?);

    info!(
        manifest = %name,
        target = target.name,
        artifacts = artifacts.len(),
        degraded = ctx.degraded.len(),
        "Exported manifest"
    );
    Ok(ExportResult::Exported(artifacts))
}

fn warnings_artifact(ctx: &ExportContext<'_>, notes: &[String]) -> ExportArtifact {
    let mut out = format!(
        "# Export warnings\n\nTarget `{}` ({}) exported `{}` with changes.\n\n",
        ctx.target.name,
        ctx.target.format_version,
        ctx.name()
    );
    if !ctx.degraded.is_empty() {
        out.push_str("Omitted features:\n\n");
    }
    for feature in &ctx.degraded {
        out.push_str(&format!("## `{}`\n\n", feature));
        for origin in ctx.features.origins(feature) {
            out.push_str(&format!("- {}\n", origin));
        }
        out.push('\n');
    }
    if !notes.is_empty() {
        out.push_str("## Notes\n\n");
        for note in notes {
            out.push_str(&format!("- {}\n", note));
        }
        out.push('\n');
    }
    ExportArtifact::new(WARNINGS_FILE, ArtifactKind::Warning, out)
}
