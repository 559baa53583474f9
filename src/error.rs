//! Error types for the img2detect library.
//!
//! Every variant is terminal for the *current attempt only*: the user can
//! immediately re-select a file or retry the upload. Nothing here aborts the
//! process — the CLI decides its own exit code, and an embedding application
//! keeps its event loop running.
//!
//! One deliberate asymmetry: [`DetectError::Transport`] keeps the underlying
//! cause (for `tracing` logs and debugging) but the user-facing notification
//! built from it is always the generic [`DetectError::user_message`]. A "DNS
//! lookup failed" vs "HTTP 502" distinction helps nobody selecting a photo.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the img2detect library.
#[derive(Debug, Error)]
pub enum DetectError {
    // ── Local errors (no network involved) ────────────────────────────────
    /// Upload was triggered with no image selected.
    #[error("No file selected")]
    NoFileSelected,

    /// The selected file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    FileReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The selected bytes could not be decoded as TIFF (or re-encoded as PNG).
    ///
    /// Raised before any network call — a payload that failed conversion is
    /// never uploaded.
    #[error("Failed to convert '{file_name}': {detail}")]
    ConversionFailure { file_name: String, detail: String },

    /// A second upload was started while one is already in flight.
    #[error("An upload is already in progress")]
    UploadInFlight,

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Network failure, non-success status, or unparsable response body.
    ///
    /// The detail is retained for logs only; user messaging stays generic.
    #[error("Detection request failed: {detail}")]
    Transport { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a returned artifact to disk.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DetectError {
    /// The message shown to the user through the notification port.
    ///
    /// Local mistakes name themselves; everything that happened after the
    /// request left the machine collapses to one generic retry prompt.
    pub fn user_message(&self) -> &'static str {
        match self {
            DetectError::NoFileSelected => "No file selected",
            DetectError::UploadInFlight => "An upload is already in progress",
            DetectError::FileReadFailure { .. } => "Could not read the selected file",
            DetectError::ConversionFailure { .. } => "Could not convert the selected image",
            _ => "Error processing image — please try again",
        }
    }
}
