//! BLAKE3 digests of generated artifacts.

use super::artifact::ExportArtifact;
use blake3::Hasher;

pub type Digest = [u8; 32];

/// Hash of one artifact's content.
pub fn content_hash(content: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Digest over a whole artifact set.
///
/// digest = hash("bundle" || count || for each artifact: path_len || path || kind || content_hash)
///
/// Artifacts must already be sorted by path.
pub fn bundle_digest(artifacts: &[ExportArtifact]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(b"bundle");
    hasher.update(&(artifacts.len() as u64).to_be_bytes());
    for artifact in artifacts {
        let path = artifact.path.as_bytes();
        hasher.update(&(path.len() as u64).to_be_bytes());
        hasher.update(path);
        hasher.update(artifact.kind.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(&content_hash(artifact.content.as_bytes()));
    }
    *hasher.finalize().as_bytes()
}

pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}
