//! Writing export artifacts to disk.
//!
//! Artifact paths are relative to `out_dir/<target>/`. Anything that could escape that
//! directory is refused before a single byte is written.

use super::report::WrittenArtifact;
use crate::error::PipelineError;
use crate::export::{content_hash, to_hex, ExportArtifact};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Check that an artifact path is a plain relative path and return it.
pub fn safe_relative_path(raw: &str) -> Result<PathBuf, PipelineError> {
    let unsafe_path = || PipelineError::UnsafeArtifactPath(raw.to_string());

    if raw.is_empty() || raw.starts_with('/') || raw.starts_with('\\') {
        return Err(unsafe_path());
    }
    // Empty components (`a//b`, trailing `/`) are ambiguous once joined.
    if raw.split(['/', '\\']).any(|part| part.is_empty() || part == "..") {
        return Err(unsafe_path());
    }

    let path = PathBuf::from(raw);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }
    Ok(path)
}

/// Directory a target's artifacts land in.
pub fn target_dir(out_dir: &Path, target: &str) -> Result<PathBuf, PipelineError> {
    Ok(out_dir.join(safe_relative_path(target)?))
}

/// Write every artifact under `dir`. All paths are checked before anything is written.
pub fn write_artifacts(
    dir: &Path,
    artifacts: &[ExportArtifact],
) -> Result<Vec<WrittenArtifact>, PipelineError> {
    let checked = artifacts
        .iter()
        .map(|artifact| Ok((safe_relative_path(&artifact.path)?, artifact)))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let root = dunce::canonicalize(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut written = Vec::with_capacity(checked.len());
    for (relative, artifact) in checked {
        let path = root.join(&relative);
        write_atomic(&path, artifact.content.as_bytes())?;
        written.push(WrittenArtifact {
            path,
            kind: artifact.kind,
            blake3: to_hex(&content_hash(artifact.content.as_bytes())),
        });
    }

    debug!(dir = %root.display(), artifacts = written.len(), "Wrote artifacts");
    Ok(written)
}

/// Write a whole file through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content).map_err(|e| PipelineError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PipelineError::io(path, e)
    })
}
