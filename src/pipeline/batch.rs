//! Batch execution over many manifests.
//!
//! Each manifest runs on the blocking pool; a semaphore bounds how many run at once.
//! Results come back in input order whatever order tasks finish in.

use super::report::{first_failure, ExitStatus, ExportReport, MigrateReport, ValidateReport};
use super::Pipeline;
use crate::error::PipelineError;
use crate::export::ExportOptions;
use crate::schema::VersionSelector;
use crate::validator::ValidationMode;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// What to do with every manifest of a batch.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Validate {
        selector: Option<VersionSelector>,
        mode: Option<ValidationMode>,
    },
    /// Migrated documents land in `output_dir` under their own file name when given.
    Migrate {
        to: VersionSelector,
        output_dir: Option<PathBuf>,
    },
    /// Each manifest exports to `out_dir/<file stem>/<target>/`.
    Export {
        targets: Vec<String>,
        out_dir: PathBuf,
        options: ExportOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum BatchOutcome {
    Validated(ValidateReport),
    Migrated(MigrateReport),
    Exported(ExportReport),
    /// The manifest could not be processed at all.
    Failed {
        message: String,
        #[serde(skip)]
        exit: ExitStatus,
    },
}

impl BatchOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            BatchOutcome::Validated(report) => report.exit_status(),
            BatchOutcome::Migrated(report) => report.exit_status(),
            BatchOutcome::Exported(report) => report.exit_status(),
            BatchOutcome::Failed { exit, .. } => *exit,
        }
    }

    fn from_error(err: &PipelineError) -> Self {
        BatchOutcome::Failed {
            message: err.to_string(),
            exit: ExitStatus::from(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Status of the first failing manifest, in input order.
    pub fn exit_status(&self) -> ExitStatus {
        first_failure(self.items.iter().map(|item| item.outcome.exit_status()))
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.exit_status().is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Runs one operation over many manifests on the tokio runtime.
pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    concurrency: usize,
}

impl BatchRunner {
    /// Runner bounded by the pipeline's `batch.concurrency`.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let concurrency = pipeline.config().batch.concurrency;
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run(
        &self,
        paths: Vec<PathBuf>,
        operation: BatchOperation,
    ) -> Result<BatchReport, PipelineError> {
        let destinations = destinations(&paths, &operation);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let operation = Arc::new(operation);

        info!(
            manifests = paths.len(),
            concurrency = self.concurrency,
            "Starting batch"
        );

        let mut handles = Vec::with_capacity(paths.len());
        for (path, destination) in paths.iter().cloned().zip(destinations) {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::Task("semaphore closed".to_string()))?;
            let pipeline = Arc::clone(&self.pipeline);
            let operation = Arc::clone(&operation);

            handles.push(tokio::task::spawn_blocking(move || {
                let outcome = process(&pipeline, &path, &operation, destination.as_deref());
                drop(permit);
                outcome
            }));
        }

        let mut items = Vec::with_capacity(handles.len());
        for (path, handle) in paths.into_iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => BatchOutcome::from_error(&PipelineError::Task(e.to_string())),
            };
            debug!(path = %path.display(), status = outcome.exit_status().code(), "Batch item finished");
            items.push(BatchItem { path, outcome });
        }

        let report = BatchReport { items };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }
}

fn process(
    pipeline: &Pipeline,
    path: &Path,
    operation: &BatchOperation,
    destination: Option<&Path>,
) -> BatchOutcome {
    let result = match operation {
        BatchOperation::Validate { selector, mode } => pipeline
            .validate_path(path, selector.as_ref(), *mode)
            .map(BatchOutcome::Validated),
        BatchOperation::Migrate { to, .. } => pipeline
            .migrate_path(path, to, destination)
            .map(BatchOutcome::Migrated),
        BatchOperation::Export {
            targets, options, ..
        } => match destination {
            Some(out_dir) => pipeline
                .export_path(path, targets, out_dir, options)
                .map(BatchOutcome::Exported),
            None => Err(PipelineError::UnsafeArtifactPath(path.display().to_string())),
        },
    };
    result.unwrap_or_else(|err| BatchOutcome::from_error(&err))
}

/// Per-manifest output location. Names that collide get a `-2`, `-3`, ... suffix in
/// input order.
fn destinations(paths: &[PathBuf], operation: &BatchOperation) -> Vec<Option<PathBuf>> {
    let (dir, keep_extension) = match operation {
        BatchOperation::Validate { .. } => return vec![None; paths.len()],
        BatchOperation::Migrate { output_dir, .. } => match output_dir {
            Some(dir) => (dir, true),
            None => return vec![None; paths.len()],
        },
        BatchOperation::Export { out_dir, .. } => (out_dir, false),
    };

    let mut taken: BTreeSet<OsString> = BTreeSet::new();
    paths
        .iter()
        .map(|path| {
            let stem = path.file_stem().unwrap_or_default().to_os_string();
            let extension = path.extension().filter(|_| keep_extension);
            let mut n = 1;
            loop {
                let mut name = stem.clone();
                if n > 1 {
                    name.push(format!("-{}", n));
                }
                if let Some(ext) = extension {
                    name.push(".");
                    name.push(ext);
                }
                if taken.insert(name.clone()) {
                    return Some(dir.join(name));
                }
                n += 1;
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_destinations_are_unique() {
        let paths = vec![
            PathBuf::from("a/bot.yaml"),
            PathBuf::from("b/bot.yaml"),
            PathBuf::from("b/other.json"),
        ];
        let operation = BatchOperation::Export {
            targets: Vec::new(),
            out_dir: PathBuf::from("dist"),
            options: ExportOptions::default(),
        };
        let dirs: Vec<_> = destinations(&paths, &operation).into_iter().flatten().collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from("dist/bot"), PathBuf::from("dist/bot-2"), PathBuf::from("dist/other")]
        );
    }

    #[test]
    fn test_migrate_destinations_keep_extension() {
        let paths = vec![PathBuf::from("x/bot.json"), PathBuf::from("y/bot.json")];
        let operation = BatchOperation::Migrate {
            to: VersionSelector::Latest,
            output_dir: Some(PathBuf::from("migrated")),
        };
        let files: Vec<_> = destinations(&paths, &operation).into_iter().flatten().collect();
        assert_eq!(
            files,
            vec![PathBuf::from("migrated/bot.json"), PathBuf::from("migrated/bot-2.json")]
        );
    }

    #[test]
    fn test_report_status_is_first_failure() {
        let report = BatchReport {
            items: vec![
                BatchItem {
                    path: PathBuf::from("ok.yaml"),
                    outcome: BatchOutcome::Failed {
                        message: "unreadable".to_string(),
                        exit: ExitStatus::ParseError,
                    },
                },
                BatchItem {
                    path: PathBuf::from("bad.yaml"),
                    outcome: BatchOutcome::Failed {
                        message: "gone".to_string(),
                        exit: ExitStatus::Failure,
                    },
                },
            ],
        };
        assert_eq!(report.exit_status(), ExitStatus::ParseError);
        assert_eq!(report.failed(), 2);
    }
}
