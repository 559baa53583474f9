//! Upload: the single multipart request against the detection service.
//!
//! The service is consumed through the [`Detector`] trait so the lifecycle
//! never knows whether it is talking to a real HTTP endpoint or a stub.
//! [`HttpDetector`] is the production implementation: one `POST
//! {base}/detect` with a single `file` part, no client-side timeout (the
//! transport's defaults apply), no retries — retry policy belongs to the
//! user pressing the button again.
//!
//! Everything that can go wrong past this boundary — refused connection,
//! non-success status, a body that isn't the expected JSON — collapses into
//! [`DetectError::Transport`]. The detail is kept for logs; the user-facing
//! notification derived from it is deliberately generic.

use crate::error::DetectError;
use crate::pipeline::ingest::SelectedImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What the detection service sends back: zero, one, or two displayable
/// image URIs.
///
/// Both fields are independently optional; both absent is a valid response
/// meaning "nothing to render". Unknown fields in the body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// Intermediate patch-analysis visualisation.
    #[serde(default)]
    pub patches: Option<String>,
    /// Final detection rendering.
    #[serde(default)]
    pub result: Option<String>,
}

impl DetectionResponse {
    /// True when the service returned nothing to render.
    pub fn is_empty(&self) -> bool {
        self.patches.is_none() && self.result.is_none()
    }
}

/// The upload seam: perform exactly one detection request for an image.
///
/// Implementations must be `Send + Sync` so an `Arc<dyn Detector>` can be
/// shared with spawned tasks. The "a selection must be present" precondition
/// is owned by [`crate::lifecycle::UploadLifecycle`] — a detector is never
/// invoked without one.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Submit the image and resolve to the service's response or a
    /// [`DetectError::Transport`] failure.
    async fn detect(&self, image: &SelectedImage) -> Result<DetectionResponse, DetectError>;
}

/// Production [`Detector`] speaking multipart/form-data over HTTP.
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    /// Build a detector for the given service base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, DetectError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DetectError::Transport {
                detail: format!("failed to construct HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Probe `GET {base}/health`.
    ///
    /// Useful for CLI `--ping` and for gating live integration tests without
    /// burning a detection request.
    pub async fn health(&self) -> Result<(), DetectError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DetectError::Transport {
                detail: format!("health check failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(DetectError::Transport {
                detail: format!("health check returned HTTP {}", response.status()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, image: &SelectedImage) -> Result<DetectionResponse, DetectError> {
        let url = format!("{}/detect", self.base_url);
        debug!(
            "POST {} — '{}' ({} bytes, {})",
            url,
            image.file_name,
            image.bytes.len(),
            image.mime_type
        );

        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| DetectError::Transport {
                detail: format!("invalid mime type '{}': {e}", image.mime_type),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Detection request to {} failed: {}", url, e);
                DetectError::Transport {
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Detection service returned HTTP {}", status);
            return Err(DetectError::Transport {
                detail: format!("HTTP {status}"),
            });
        }

        response
            .json::<DetectionResponse>()
            .await
            .map_err(|e| DetectError::Transport {
                detail: format!("malformed response body: {e}"),
            })
    }
}
