//! Version Migrator
//!
//! Migration steps connect adjacent schema versions. Forward and backward steps live
//! in separate tables; a chain is found by breadth-first search in the table of the
//! requested direction, so a missing hop is reported instead of guessed. Every chain
//! result is re-validated against the target version before it is handed back.

mod edit;
mod steps;

pub use edit::DocumentEdit;

use crate::manifest::Manifest;
use crate::schema::SchemaVersion;
use crate::validator::{ValidationError, ValidationMode, ValidationResult, Validator};
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, info};

/// What a migration step did to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationAction {
    /// Moved to a new location, value unchanged.
    Renamed,
    /// Rewritten into a different shape.
    Converted,
    /// Removed; the target version cannot express it.
    Dropped,
}

impl fmt::Display for DeprecationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeprecationAction::Renamed => "renamed",
            DeprecationAction::Converted => "converted",
            DeprecationAction::Dropped => "dropped",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deprecation {
    pub path: String,
    pub action: DeprecationAction,
    pub message: String,
    #[serde(serialize_with = "serialize_version")]
    pub from: Version,
    #[serde(serialize_with = "serialize_version")]
    pub to: Version,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {}): {} {}",
            self.path, self.from, self.to, self.action, self.message
        )
    }
}

fn serialize_version<S: serde::Serializer>(version: &Version, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(version)
}

/// A pure rewrite from one schema version to an adjacent one.
pub trait MigrationStep: Send + Sync {
    fn from_version(&self) -> &Version;

    fn to_version(&self) -> &Version;

    /// Rewrite the document. Information the target cannot hold must be recorded
    /// with `DocumentEdit::note`.
    fn rewrite(&self, edit: &mut DocumentEdit);

    fn apply(&self, manifest: &Manifest) -> (Manifest, Vec<Deprecation>) {
        let mut edit = DocumentEdit::new(manifest, self.from_version(), self.to_version());
        self.rewrite(&mut edit);
        edit.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MigrationResult {
    Migrated {
        manifest: Manifest,
        deprecations: Vec<Deprecation>,
    },
    Unsupported {
        reason: String,
        diagnostics: Vec<ValidationError>,
    },
}

impl MigrationResult {
    fn unsupported(reason: impl Into<String>) -> Self {
        MigrationResult::Unsupported {
            reason: reason.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationResult::Migrated { .. })
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            MigrationResult::Migrated { manifest, .. } => Some(manifest),
            MigrationResult::Unsupported { .. } => None,
        }
    }
}

type StepTable = BTreeMap<Version, Vec<Box<dyn MigrationStep>>>;

/// Directed graphs of migration steps.
pub struct Migrator {
    forward: StepTable,
    backward: StepTable,
    validator: Validator,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Migrator {
    /// A migrator with no registered steps.
    pub fn empty() -> Self {
        Self {
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            validator: Validator::default(),
        }
    }

    /// A migrator with the steps between all published versions.
    pub fn builtin() -> Self {
        let mut migrator = Self::empty();
        for step in steps::builtin() {
            migrator.register(step);
        }
        migrator
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Register a step. Its direction follows from comparing its versions.
    pub fn register(&mut self, step: impl MigrationStep + 'static) {
        let table = if step.to_version() > step.from_version() {
            &mut self.forward
        } else {
            &mut self.backward
        };
        table
            .entry(step.from_version().clone())
            .or_default()
            .push(Box::new(step));
    }

    /// Shortest chain of steps from `from` to `to`, if the graph has one.
    pub fn chain(&self, from: &Version, to: &Version) -> Option<Vec<&dyn MigrationStep>> {
        if from == to {
            return Some(Vec::new());
        }
        let table = if to > from { &self.forward } else { &self.backward };

        let mut visited: BTreeSet<&Version> = BTreeSet::new();
        let mut parent: BTreeMap<&Version, &dyn MigrationStep> = BTreeMap::new();
        let mut queue = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut chain = Vec::new();
                let mut cursor = to;
                while let Some(step) = parent.get(cursor) {
                    chain.push(*step);
                    cursor = step.from_version();
                }
                chain.reverse();
                return Some(chain);
            }
            for step in table.get(current).into_iter().flatten() {
                let next = step.to_version();
                if visited.insert(next) {
                    parent.insert(next, step.as_ref());
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Migrate `manifest` from schema `from` to schema `to`.
    pub fn migrate(
        &self,
        manifest: &Manifest,
        from: &SchemaVersion,
        to: &SchemaVersion,
    ) -> MigrationResult {
        if from.version() == to.version() {
            return MigrationResult::Migrated {
                manifest: manifest.clone(),
                deprecations: Vec::new(),
            };
        }

        let Some(chain) = self.chain(from.version(), to.version()) else {
            return MigrationResult::unsupported(format!(
                "no migration path from {} to {}",
                from.version(),
                to.version()
            ));
        };

        let mut current = manifest.clone();
        let mut deprecations = Vec::new();
        for step in chain {
            debug!(
                manifest = %current.display_name(),
                from = %step.from_version(),
                to = %step.to_version(),
                "Applying migration step"
            );
            let (next, notes) = step.apply(&current);
            current = next;
            deprecations.extend(notes);
        }

        match self.validator.validate(&current, to, ValidationMode::Progressive) {
            ValidationResult::Valid(migrated) => {
                info!(
                    manifest = %migrated.display_name(),
                    from = %from.version(),
                    to = %to.version(),
                    deprecations = deprecations.len(),
                    "Migrated manifest"
                );
                MigrationResult::Migrated {
                    manifest: migrated,
                    deprecations,
                }
            }
            ValidationResult::Invalid(errors) => MigrationResult::Unsupported {
                reason: format!(
                    "migrated manifest does not validate against {} ({} error(s))",
                    to.version(),
                    errors.len()
                ),
                diagnostics: errors,
            },
        }
    }
}
