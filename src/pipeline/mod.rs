//! Pipeline stages for the upload-and-detect flow.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. point the upload stage at a stub service)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ raster ──▶ upload ──▶ present
//! (file read) (TIFF→PNG) (multipart) (ordered artifacts)
//! ```
//!
//! 1. [`ingest`]  — read the selected file and classify it by declared type
//! 2. [`raster`]  — normalise TIFF to PNG; pure and synchronous, only runs
//!    when the classification demands it
//! 3. [`upload`]  — the single multipart request; the only stage with
//!    network I/O
//! 4. [`present`] — turn the (possibly sparse) response into an ordered,
//!    renderable artifact list
//!
//! [`ingest`] and [`raster`] have no dependency on network code; [`upload`]
//! depends on nothing but the normalised image. Orchestration and all mutable
//! state live in [`crate::lifecycle`].

pub mod ingest;
pub mod present;
pub mod raster;
pub mod upload;
