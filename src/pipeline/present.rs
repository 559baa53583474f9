//! Presentation: turn a (possibly sparse) response into renderable artifacts.
//!
//! Purely derived, read-only state: the presenter owns nothing mutable and
//! renders whatever the lifecycle currently stores. Present fields become
//! artifacts in a fixed order — patch analysis first, final detection second
//! — and absent fields produce nothing at all (no placeholder). An empty
//! response is a valid "nothing to render", not an error.

use crate::error::DetectError;
use crate::pipeline::upload::DetectionResponse;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which of the two visual artifacts this is. Order of the variants is the
/// fixed rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Intermediate patch-analysis visualisation.
    Patches,
    /// Final detection rendering.
    Result,
}

impl ArtifactKind {
    /// Human-readable heading for this artifact.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Patches => "Patch analysis",
            ArtifactKind::Result => "Final detection",
        }
    }

    /// Filename component used when saving to disk.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Patches => "patches",
            ArtifactKind::Result => "result",
        }
    }
}

/// One returned visual: a displayable URI tagged with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub uri: String,
}

/// Flatten the current response into the ordered artifact list.
///
/// `None` (no response yet) and an empty response both yield an empty list.
pub fn artifacts(response: Option<&DetectionResponse>) -> Vec<Artifact> {
    let Some(response) = response else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(2);
    if let Some(uri) = &response.patches {
        out.push(Artifact {
            kind: ArtifactKind::Patches,
            uri: uri.clone(),
        });
    }
    if let Some(uri) = &response.result {
        out.push(Artifact {
            kind: ArtifactKind::Result,
            uri: uri.clone(),
        });
    }
    out
}

/// Decode a `data:{mime};base64,{payload}` URI into (mime type, raw bytes).
///
/// Returns `None` for anything that isn't a well-formed base64 data URI —
/// including `data:` URIs with a bad payload, which are logged and skipped
/// rather than surfaced as an error (the reference service only ever emits
/// valid base64-embedded PNGs; anything else is rendered verbatim as text).
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;

    match STANDARD.decode(payload) {
        Ok(bytes) => Some((mime.to_string(), bytes)),
        Err(e) => {
            warn!("data URI with undecodable base64 payload: {}", e);
            None
        }
    }
}

impl Artifact {
    /// Persist this artifact under `dir` as `{stem}.{suffix}.{ext}`.
    ///
    /// Only base64 data URIs are written; for any other URI the caller should
    /// display the string itself (the presenter performs no network fetch),
    /// and `Ok(None)` is returned.
    pub async fn save_to(
        &self,
        dir: impl AsRef<Path>,
        stem: &str,
    ) -> Result<Option<PathBuf>, DetectError> {
        let Some((mime, bytes)) = decode_data_uri(&self.uri) else {
            return Ok(None);
        };

        let ext = match mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "bin",
        };

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| DetectError::ArtifactWriteFailed {
                path: dir.to_path_buf(),
                source,
            })?;

        let path = dir.join(format!("{stem}.{}.{ext}", self.kind.file_suffix()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| DetectError::ArtifactWriteFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Some(path))
    }
}
