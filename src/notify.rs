//! Notification port: how the pipeline talks to the user.
//!
//! The library never prints, pops toasts, or draws spinners itself. It calls
//! this two-capability trait and lets the host decide what a "blocking
//! progress indicator" or an "error notification" looks like — an indicatif
//! spinner in the CLI, a toast in a GUI, a log line in a service.
//!
//! # Why a trait instead of channels?
//!
//! The trait is the least-invasive integration point: callers can forward
//! notifications to a terminal, a WebSocket, or a test recorder without the
//! library knowing how the host application communicates. It is `Send + Sync`
//! so a lifecycle owning an `Arc<dyn Notifier>` can live inside `tokio::spawn`.

use std::sync::Arc;

/// Receives user-facing events from the upload lifecycle.
///
/// All methods have default no-op implementations so hosts only override what
/// they care about. `show_blocking_progress` and `dismiss_blocking_progress`
/// always arrive as a bracket around a single upload attempt — every show is
/// followed by exactly one dismiss, on success and on failure alike.
pub trait Notifier: Send + Sync {
    /// A terminal, user-facing failure for the current attempt.
    fn notify_error(&self, message: &str) {
        let _ = message;
    }

    /// An upload attempt started; the user should see a busy indicator.
    fn show_blocking_progress(&self, message: &str) {
        let _ = message;
    }

    /// The upload attempt finished (either way); hide the busy indicator.
    fn dismiss_blocking_progress(&self) {}
}

/// A no-op implementation for callers that don't surface notifications.
///
/// This is the default when no notifier is configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

/// Convenience alias matching the type stored by [`crate::lifecycle::UploadLifecycle`].
pub type SharedNotifier = Arc<dyn Notifier>;
