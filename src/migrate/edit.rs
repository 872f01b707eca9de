//! In-place edits on a manifest document, with deprecation bookkeeping.

use super::{Deprecation, DeprecationAction};
use crate::manifest::{api_version_for, Manifest};
use semver::Version;
use serde_json::{Map, Value};

/// A manifest being rewritten by one migration step.
pub struct DocumentEdit {
    document: Map<String, Value>,
    from: Version,
    to: Version,
    deprecations: Vec<Deprecation>,
}

impl DocumentEdit {
    pub fn new(manifest: &Manifest, from: &Version, to: &Version) -> Self {
        Self {
            document: manifest.document().as_object().cloned().unwrap_or_default(),
            from: from.clone(),
            to: to.clone(),
            deprecations: Vec::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.document.get(parts.next()?)?;
        parts.try_fold(first, |node, part| node.get(part))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut parts = path.split('.');
        let first = self.document.get_mut(parts.next()?)?;
        parts.try_fold(first, |node, part| node.get_mut(part))
    }

    /// Remove and return the value at `path`.
    pub fn take(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.document.remove(path),
            Some((parent, leaf)) => self.get_mut(parent)?.as_object_mut()?.remove(leaf),
        }
    }

    /// Set the value at `path`, creating intermediate objects. A non-object in the
    /// way is replaced.
    pub fn insert(&mut self, path: &str, value: Value) {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut node = &mut self.document;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                let slot = node
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                node = match slot {
                    Value::Object(map) => map,
                    _ => return,
                };
            }
        }
        node.insert(leaf.to_string(), value);
    }

    /// Drop the object at `path` when nothing is left in it.
    pub fn remove_if_empty(&mut self, path: &str) {
        let empty = self
            .get(path)
            .and_then(Value::as_object)
            .is_some_and(Map::is_empty);
        if empty {
            self.take(path);
        }
    }

    pub fn note(&mut self, path: impl Into<String>, action: DeprecationAction, message: impl Into<String>) {
        self.deprecations.push(Deprecation {
            path: path.into(),
            action,
            message: message.into(),
            from: self.from.clone(),
            to: self.to.clone(),
        });
    }

    /// Stamp the target `apiVersion` and hand back the rewritten manifest.
    pub fn finish(mut self) -> (Manifest, Vec<Deprecation>) {
        self.document
            .insert("apiVersion".to_string(), Value::String(api_version_for(&self.to)));
        (Manifest::from_map(self.document), self.deprecations)
    }
}
