//! Configuration for the detection client.
//!
//! All behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share a config across an application and to diff two runs to understand
//! why their outcomes differ.
//!
//! The service base URL is resolved exactly once, at [`ClientConfigBuilder::build`]
//! time, from the most-specific source available:
//!
//! 1. An explicit [`ClientConfigBuilder::base_url`] value
//! 2. The `DETECT_API_URL` environment variable
//! 3. The default `http://localhost:8000`
//!
//! After that it is constant for the lifetime of the config. A pre-built
//! [`Detector`] takes precedence over URL resolution entirely — useful in
//! tests or when the caller needs custom middleware around the transport.

use crate::error::DetectError;
use crate::notify::Notifier;
use crate::pipeline::upload::Detector;
use std::fmt;
use std::sync::Arc;

/// Environment variable consulted when no base URL is set explicitly.
pub const BASE_URL_ENV: &str = "DETECT_API_URL";

/// Fallback service URL matching the reference backend's dev default.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for an upload lifecycle.
///
/// Built via [`ClientConfig::builder()`] or [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use img2detect::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://detect.internal:8000")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Detection-service base URL, without a trailing slash.
    pub base_url: String,

    /// Pre-constructed detector. Takes precedence over `base_url`.
    pub detector: Option<Arc<dyn Detector>>,

    /// Notification sink for user-facing events. `None` means no-op.
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(None),
            detector: None,
            notifier: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("detector", &self.detector.as_ref().map(|_| "<dyn Detector>"))
            .field("notifier", &self.notifier.as_ref().map(|_| "<dyn Notifier>"))
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: None,
            detector: None,
            notifier: None,
        }
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    detector: Option<Arc<dyn Detector>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ClientConfigBuilder {
    /// Set the detection-service base URL explicitly.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Inject a pre-built detector (test seam / custom transport).
    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Inject a notification sink.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the configuration, resolving and validating the base URL.
    pub fn build(self) -> Result<ClientConfig, DetectError> {
        let base_url = resolve_base_url(self.base_url.as_deref());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(DetectError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        Ok(ClientConfig {
            base_url,
            detector: self.detector,
            notifier: self.notifier,
        })
    }
}

/// Resolve the base URL from explicit value → environment → default,
/// trimming any trailing slash so `{base}/detect` joins cleanly.
fn resolve_base_url(explicit: Option<&str>) -> String {
    let url = match explicit {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => match std::env::var(BASE_URL_ENV) {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => DEFAULT_BASE_URL.to_string(),
        },
    };
    url.trim_end_matches('/').to_string()
}
