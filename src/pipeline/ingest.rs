//! Ingestion: turn a user-selected file into an uploadable image + preview.
//!
//! Reads the file's bytes asynchronously (the pipeline's first suspension
//! point) and classifies it by declared type — the file extension, which is
//! the CLI-side equivalent of a picker's declared mime type. TIFF is the one
//! format that needs normalisation before it can be previewed or uploaded;
//! everything else passes through byte-identical.

use crate::error::DetectError;
use crate::pipeline::raster;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// The currently selected image: raw bytes plus the metadata the service
/// needs to receive them.
///
/// Replaced wholesale when conversion occurs — a converted selection is a new
/// `SelectedImage` with PNG bytes, a normalised mime type, and a renamed
/// filename, never a mutation of the original.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl fmt::Debug for SelectedImage {
    // Summarise the byte buffer instead of dumping megabytes into logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .finish()
    }
}

/// A displayable representation of the selection: a `data:` URI that any
/// rendering surface can bind directly.
///
/// One preview is live at a time; regenerating it discards the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewUri(String);

impl PreviewUri {
    /// Base64-embed raw image bytes as a `data:{mime};base64,…` URI.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        PreviewUri(format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// A successful ingestion: the uploadable image and its preview.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub image: SelectedImage,
    pub preview: PreviewUri,
}

/// Map a file name to its declared mime type by extension.
///
/// Unknown extensions fall back to `application/octet-stream`; the service is
/// the authority on whether it can handle those, not the client.
pub fn classify_mime(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("tif") | Some("tiff") => "image/tiff",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Read a user-chosen file and produce a [`SelectedImage`] plus [`PreviewUri`].
///
/// TIFF input is handed to [`crate::pipeline::raster`] before the preview is
/// finalised, so the returned selection is always directly displayable and
/// uploadable. For every other declared type the raw bytes feed both the
/// selection and the preview unchanged.
///
/// # Errors
/// - [`DetectError::FileReadFailure`] when the file cannot be read
/// - [`DetectError::ConversionFailure`] when declared-TIFF bytes don't decode
pub async fn ingest(path: impl AsRef<Path>) -> Result<Ingested, DetectError> {
    let path = path.as_ref();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DetectError::FileReadFailure {
            path: path.to_path_buf(),
            source,
        })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let mime_type = classify_mime(&file_name);

    debug!(
        "Ingested '{}': {} bytes, declared {}",
        file_name,
        bytes.len(),
        mime_type
    );

    let image = SelectedImage {
        bytes,
        mime_type: mime_type.to_string(),
        file_name,
    };

    if mime_type == "image/tiff" {
        let converted = raster::convert_tiff(&image)?;
        return Ok(Ingested {
            image: converted.image,
            preview: converted.preview,
        });
    }

    let preview = PreviewUri::from_bytes(&image.mime_type, &image.bytes);
    Ok(Ingested { image, preview })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension() {
        assert_eq!(classify_mime("scan.tiff"), "image/tiff");
        assert_eq!(classify_mime("scan.TIF"), "image/tiff");
        assert_eq!(classify_mime("photo.png"), "image/png");
        assert_eq!(classify_mime("photo.JPEG"), "image/jpeg");
        assert_eq!(classify_mime("clip.webp"), "image/webp");
        assert_eq!(classify_mime("unknown.xyz"), "application/octet-stream");
        assert_eq!(classify_mime("no_extension"), "application/octet-stream");
    }

    #[test]
    fn preview_uri_shape() {
        let uri = PreviewUri::from_bytes("image/png", b"abc");
        assert!(uri.as_str().starts_with("data:image/png;base64,"));
        // "abc" → "YWJj"
        assert!(uri.as_str().ends_with("YWJj"));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_failure() {
        let err = ingest("/definitely/not/a/real/file.png").await.unwrap_err();
        assert!(matches!(err, DetectError::FileReadFailure { .. }));
    }

    #[tokio::test]
    async fn non_tiff_passes_through_byte_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pixel.png");

        // A real 1×1 PNG so the preview is genuinely displayable.
        let mut png = Vec::new();
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([1, 2, 3, 255]),
        ));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");
        std::fs::write(&path, &png).expect("write fixture");

        let ingested = ingest(&path).await.expect("ingest should succeed");

        assert_eq!(ingested.image.bytes, png, "bytes must pass through unchanged");
        assert_eq!(ingested.image.mime_type, "image/png");
        assert_eq!(ingested.image.file_name, "pixel.png");
        assert!(ingested.preview.as_str().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn declared_tiff_is_normalised() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grid.tiff");

        let mut tiff = Vec::new();
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            3,
            2,
            image::Rgba([9, 8, 7, 255]),
        ));
        img.write_to(&mut std::io::Cursor::new(&mut tiff), image::ImageFormat::Tiff)
            .expect("encode tiff");
        std::fs::write(&path, &tiff).expect("write fixture");

        let ingested = ingest(&path).await.expect("ingest should succeed");

        assert_eq!(ingested.image.mime_type, "image/png");
        assert_eq!(ingested.image.file_name, "grid.png");
        assert!(ingested.preview.as_str().starts_with("data:image/png;base64,"));
    }
}
