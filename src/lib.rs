//! # img2detect
//!
//! Upload an image to a remote person-detection service and retrieve the
//! annotated results.
//!
//! ## Why this crate?
//!
//! The detection service accepts any raster the `PIL`-style backend can open,
//! but the things that *display* results — terminals writing PNGs, browsers,
//! GUI surfaces — cannot show a TIFF, and a service round-trip should never
//! be spent discovering that. This crate owns the client side of that
//! contract: it classifies the selected file, normalises TIFF to PNG before
//! anything is previewed or sent, performs the single multipart upload, and
//! keeps the returned visualisations consistent with what the user most
//! recently selected.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image file
//!  │
//!  ├─ 1. Ingest   read bytes, classify by declared type, build preview
//!  ├─ 2. Raster   TIFF → PNG normalisation (only when needed)
//!  ├─ 3. Upload   one multipart POST {base}/detect
//!  └─ 4. Present  ordered artifacts: patch analysis, final detection
//! ```
//!
//! All mutable state lives in one place, the [`UploadLifecycle`] state
//! machine (`Idle → FileSelected → Uploading → Succeeded | Failed`), which
//! also enforces the two rendering guarantees: results are cleared the
//! moment a new attempt begins, and a response that arrives for a superseded
//! selection is discarded by identity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2detect::{ClientConfig, UploadLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Base URL from DETECT_API_URL, default http://localhost:8000
//!     let config = ClientConfig::default();
//!     let mut lifecycle = UploadLifecycle::new(&config)?;
//!
//!     lifecycle.select_file("photo.tiff").await?;
//!     lifecycle.upload().await?;
//!
//!     for artifact in lifecycle.artifacts() {
//!         println!("{}: {} bytes of URI", artifact.kind.label(), artifact.uri.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2detect` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! img2detect = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use error::DetectError;
pub use lifecycle::{LifecycleState, UploadLifecycle, UploadOutcome, UploadTicket};
pub use notify::{NoopNotifier, Notifier, SharedNotifier};
pub use pipeline::ingest::{Ingested, PreviewUri, SelectedImage};
pub use pipeline::present::{artifacts, decode_data_uri, Artifact, ArtifactKind};
pub use pipeline::upload::{DetectionResponse, Detector, HttpDetector};
