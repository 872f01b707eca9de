use super::kubernetes::KubernetesExporter;
use super::langchain::LangChainExporter;
use super::Exporter;
use crate::error::PipelineError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Exporters keyed by target name.
#[derive(Clone, Default)]
pub struct ExporterRegistry {
    exporters: BTreeMap<String, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every target shipped in the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LangChainExporter::new()));
        registry.register(Arc::new(KubernetesExporter::new()));
        registry
    }

    /// Register an exporter under its target name, replacing any previous one.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) {
        self.exporters
            .insert(exporter.target().name.to_string(), exporter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Exporter>, PipelineError> {
        self.exporters
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTarget(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exporters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Exporter>> {
        self.exporters.values()
    }
}

impl std::fmt::Debug for ExporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
