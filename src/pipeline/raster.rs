//! Raster normalisation: TIFF → PNG for preview and upload.
//!
//! TIFF is a container format that typical rendering surfaces cannot display
//! without decoding, so a declared-TIFF selection is decoded into an
//! in-memory pixel surface and re-encoded as PNG before anything else sees
//! it. PNG is chosen because it is lossless — the converted payload carries
//! exactly the pixels the user selected, which matters when the service draws
//! detection boxes back onto them.
//!
//! This is a pure, synchronous transform: once the source bytes are in
//! memory there is no I/O and no suspension. Multi-page TIFFs convert the
//! first page only; that is an explicit scope limitation, not a bug.

use crate::error::DetectError;
use crate::pipeline::ingest::{PreviewUri, SelectedImage};
use image::GenericImageView;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// A completed conversion: the PNG replacement selection and its preview.
#[derive(Debug, Clone)]
pub struct Converted {
    pub image: SelectedImage,
    pub preview: PreviewUri,
}

/// Decode a TIFF selection and re-encode its first page as PNG.
///
/// The returned [`SelectedImage`] replaces the original wholesale: PNG bytes,
/// `image/png` mime type, and the original filename with its extension
/// swapped to `.png`. Pixel dimensions and pixel values of the first image
/// plane are preserved.
///
/// # Errors
/// [`DetectError::ConversionFailure`] when the bytes are not valid TIFF or
/// the PNG encode fails. The caller must not upload after a failure — a
/// payload that didn't convert is a payload the user never previewed.
pub fn convert_tiff(source: &SelectedImage) -> Result<Converted, DetectError> {
    let decoded = image::load_from_memory_with_format(&source.bytes, image::ImageFormat::Tiff)
        .map_err(|e| DetectError::ConversionFailure {
            file_name: source.file_name.clone(),
            detail: e.to_string(),
        })?;

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| DetectError::ConversionFailure {
            file_name: source.file_name.clone(),
            detail: format!("PNG re-encode failed: {e}"),
        })?;

    let file_name = Path::new(&source.file_name)
        .with_extension("png")
        .to_string_lossy()
        .into_owned();

    debug!(
        "Converted '{}' ({} TIFF bytes) → '{}' ({} PNG bytes, {}×{})",
        source.file_name,
        source.bytes.len(),
        file_name,
        png.len(),
        decoded.width(),
        decoded.height()
    );

    let preview = PreviewUri::from_bytes("image/png", &png);

    Ok(Converted {
        image: SelectedImage {
            bytes: png,
            mime_type: "image/png".to_string(),
            file_name,
        },
        preview,
    })
}
