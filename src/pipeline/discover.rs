//! Finding manifest files for batch runs.

use crate::error::PipelineError;
use crate::manifest::ManifestFormat;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

/// Manifest files under `root`, sorted by path.
///
/// A file argument is returned as-is regardless of its extension. Directories are
/// walked without following symlinks and yield `.yaml`, `.yml` and `.json` files.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(PipelineError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            PipelineError::io(path, std::io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_file() && ManifestFormat::from_path(entry.path()).is_some() {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Expand every input into manifest paths, keeping input order between inputs.
pub fn discover_all(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut paths = Vec::new();
    for input in inputs {
        paths.extend(discover(input)?);
    }
    Ok(paths)
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}
