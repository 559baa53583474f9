//! The upload lifecycle: the only stateful component in the crate.
//!
//! Owns the selection, its preview, the last stored response, and the state
//! machine tying them together:
//!
//! ```text
//! Idle ──select──▶ FileSelected ──upload──▶ Uploading ──▶ Succeeded
//!   ▲                  ▲                        │
//!   └── ingest failed  └──── new selection ─────┴──────▶ Failed
//! ```
//!
//! Two rules keep rendering honest:
//!
//! * **Reset on attempt** — entering `Uploading` clears the previously stored
//!   response, so a spinner is never shown next to stale results and a failed
//!   retry never silently keeps the old ones.
//! * **Staleness discard** — every upload carries the sequence number of the
//!   selection it was issued for. A response whose sequence no longer matches
//!   the live selection is dropped without touching state. Correctness never
//!   depends on UI-affordance timing.
//!
//! The convenience [`UploadLifecycle::upload`] holds `&mut self` across the
//! whole round-trip, so the borrow checker itself enforces "one request in
//! flight" for that path. Event-driven hosts that must interleave a new
//! selection while a request is pending use the split
//! [`UploadLifecycle::begin_upload`] / [`UploadLifecycle::finish_upload`]
//! pair, which is where the sequence tag earns its keep.

use crate::config::ClientConfig;
use crate::error::DetectError;
use crate::notify::{NoopNotifier, Notifier};
use crate::pipeline::ingest::{self, PreviewUri, SelectedImage};
use crate::pipeline::present::{self, Artifact};
use crate::pipeline::upload::{DetectionResponse, Detector, HttpDetector};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Message shown while an upload is in flight.
const PROGRESS_MESSAGE: &str = "Processing your image…";

/// Where the machine currently is. Exactly one state is active at any time;
/// the value is process-local and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    FileSelected,
    Uploading,
    Succeeded,
    Failed,
}

/// Proof that an upload attempt was begun, carrying the image to send and the
/// selection identity it was issued for.
#[derive(Debug)]
pub struct UploadTicket {
    seq: u64,
    pub image: SelectedImage,
}

/// How a finished upload attempt was applied to the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The response was stored; the lifecycle is now `Succeeded`.
    Applied,
    /// The attempt failed; the user was notified and the lifecycle is `Failed`.
    Failed,
    /// The selection changed while the request was in flight; the result was
    /// discarded silently and state was left untouched.
    Stale,
}

/// The orchestrator: drives ingest → (raster) → upload → present and owns all
/// shared mutable state.
pub struct UploadLifecycle {
    state: LifecycleState,
    selection: Option<SelectedImage>,
    preview: Option<PreviewUri>,
    response: Option<DetectionResponse>,
    /// Identity of the current selection; bumped on every `select_file`.
    selection_seq: u64,
    detector: Arc<dyn Detector>,
    notifier: Arc<dyn Notifier>,
}

impl UploadLifecycle {
    /// Build a lifecycle from config: a pre-built detector wins, otherwise an
    /// [`HttpDetector`] is constructed for the resolved base URL.
    pub fn new(config: &ClientConfig) -> Result<Self, DetectError> {
        let detector: Arc<dyn Detector> = match &config.detector {
            Some(d) => Arc::clone(d),
            None => Arc::new(HttpDetector::new(&config.base_url)?),
        };
        let notifier: Arc<dyn Notifier> = match &config.notifier {
            Some(n) => Arc::clone(n),
            None => Arc::new(NoopNotifier),
        };

        Ok(Self {
            state: LifecycleState::Idle,
            selection: None,
            preview: None,
            response: None,
            selection_seq: 0,
            detector,
            notifier,
        })
    }

    // ── Read-only views ──────────────────────────────────────────────────

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn selection(&self) -> Option<&SelectedImage> {
        self.selection.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewUri> {
        self.preview.as_ref()
    }

    pub fn response(&self) -> Option<&DetectionResponse> {
        self.response.as_ref()
    }

    /// The currently renderable artifacts, in fixed patches-then-result order.
    pub fn artifacts(&self) -> Vec<Artifact> {
        present::artifacts(self.response.as_ref())
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Select a new file, replacing any existing selection unconditionally —
    /// even while an upload for the old one is still in flight. The old
    /// request is not cancelled; its eventual result is discarded by the
    /// sequence check in [`Self::finish_upload`].
    ///
    /// Stored results are *not* cleared here: only the next upload attempt
    /// clears them, at the moment it begins.
    pub async fn select_file(&mut self, path: impl AsRef<Path>) -> Result<(), DetectError> {
        // The act of choosing supersedes whatever came before, whether or not
        // the new file turns out to be usable.
        self.selection_seq += 1;
        self.selection = None;
        self.preview = None;

        match ingest::ingest(path).await {
            Ok(ingested) => {
                info!(
                    "Selected '{}' ({}, {} bytes)",
                    ingested.image.file_name,
                    ingested.image.mime_type,
                    ingested.image.bytes.len()
                );
                self.selection = Some(ingested.image);
                self.preview = Some(ingested.preview);
                self.state = LifecycleState::FileSelected;
                Ok(())
            }
            Err(e) => {
                self.notifier.notify_error(e.user_message());
                self.state = LifecycleState::Idle;
                Err(e)
            }
        }
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Start an upload attempt: clear stored results, enter `Uploading`, show
    /// the blocking progress indicator, and hand back a ticket tagged with
    /// the current selection identity.
    ///
    /// With no selection present this notifies the user and returns
    /// [`DetectError::NoFileSelected`] without any state transition or
    /// network activity. While already `Uploading` it refuses with
    /// [`DetectError::UploadInFlight`].
    pub fn begin_upload(&mut self) -> Result<UploadTicket, DetectError> {
        if self.state == LifecycleState::Uploading {
            return Err(DetectError::UploadInFlight);
        }

        let Some(image) = self.selection.clone() else {
            self.notifier
                .notify_error(DetectError::NoFileSelected.user_message());
            return Err(DetectError::NoFileSelected);
        };

        // Reset on attempt: a spinner and a stale result never coexist.
        self.response = None;
        self.state = LifecycleState::Uploading;
        self.notifier.show_blocking_progress(PROGRESS_MESSAGE);

        Ok(UploadTicket {
            seq: self.selection_seq,
            image,
        })
    }

    /// Apply a resolved upload attempt.
    ///
    /// Always dismisses the progress indicator (the bracket closes on every
    /// path). If the ticket's selection identity no longer matches — a newer
    /// file was selected while this request was in flight — the result is
    /// discarded silently and state is untouched.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<DetectionResponse, DetectError>,
    ) -> UploadOutcome {
        self.notifier.dismiss_blocking_progress();

        if ticket.seq != self.selection_seq {
            debug!(
                "Discarding stale response for superseded selection (seq {} != {})",
                ticket.seq, self.selection_seq
            );
            return UploadOutcome::Stale;
        }

        match result {
            Ok(response) => {
                debug!(
                    "Applying response: patches={}, result={}",
                    response.patches.is_some(),
                    response.result.is_some()
                );
                self.response = Some(response);
                self.state = LifecycleState::Succeeded;
                UploadOutcome::Applied
            }
            Err(e) => {
                self.notifier.notify_error(e.user_message());
                self.state = LifecycleState::Failed;
                UploadOutcome::Failed
            }
        }
    }

    /// Perform one complete upload attempt for the current selection.
    ///
    /// Holding `&mut self` across the await means no second attempt and no
    /// new selection can interleave through this path; the split
    /// begin/finish API is the escape hatch for hosts that need to.
    pub async fn upload(&mut self) -> Result<UploadOutcome, DetectError> {
        let ticket = self.begin_upload()?;
        let detector = Arc::clone(&self.detector);
        let result = detector.detect(&ticket.image).await;
        Ok(self.finish_upload(ticket, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubDetector {
        calls: AtomicUsize,
        result: Mutex<Option<Result<DetectionResponse, DetectError>>>,
    }

    impl StubDetector {
        fn returning(result: Result<DetectionResponse, DetectError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(Some(result)),
            })
        }
    }

    #[async_trait]
    impl Detector for StubDetector {
        async fn detect(
            &self,
            _image: &SelectedImage,
        ) -> Result<DetectionResponse, DetectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.lock().unwrap().take().expect("single-shot stub")
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        errors: Mutex<Vec<String>>,
        shows: AtomicUsize,
        dismisses: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
        fn show_blocking_progress(&self, _message: &str) {
            self.shows.fetch_add(1, Ordering::SeqCst);
        }
        fn dismiss_blocking_progress(&self) {
            self.dismisses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lifecycle_with(
        detector: Arc<dyn Detector>,
        notifier: Arc<CountingNotifier>,
    ) -> UploadLifecycle {
        let config = ClientConfig::builder()
            .base_url("http://localhost:8000")
            .detector(detector)
            .notifier(notifier as Arc<dyn Notifier>)
            .build()
            .expect("valid config");
        UploadLifecycle::new(&config).expect("lifecycle builds")
    }

    fn write_png_fixture(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([50, 60, 70, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode fixture");
        let path = dir.path().join(name);
        std::fs::write(&path, &bytes).expect("write fixture");
        path
    }

    fn full_response() -> DetectionResponse {
        DetectionResponse {
            patches: Some("uri-A".into()),
            result: Some("uri-B".into()),
        }
    }

    #[tokio::test]
    async fn upload_without_selection_never_calls_detector() {
        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector.clone(), notifier.clone());

        let err = lc.upload().await.unwrap_err();
        assert!(matches!(err, DetectError::NoFileSelected));
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            notifier.errors.lock().unwrap().as_slice(),
            ["No file selected"]
        );
        assert_eq!(lc.state(), LifecycleState::Idle, "no state transition");
        assert_eq!(notifier.shows.load(Ordering::SeqCst), 0, "no progress shown");
    }

    #[tokio::test]
    async fn successful_upload_stores_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png_fixture(&dir, "a.png");

        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier.clone());

        lc.select_file(&path).await.expect("select succeeds");
        assert_eq!(lc.state(), LifecycleState::FileSelected);
        assert!(lc.preview().is_some());

        let outcome = lc.upload().await.expect("upload path succeeds");
        assert_eq!(outcome, UploadOutcome::Applied);
        assert_eq!(lc.state(), LifecycleState::Succeeded);

        let arts = lc.artifacts();
        assert_eq!(arts.len(), 2);
        assert_eq!(arts[0].uri, "uri-A");
        assert_eq!(arts[1].uri, "uri-B");

        // Progress bracket: one show, one dismiss.
        assert_eq!(notifier.shows.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.dismisses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_upload_notifies_generically_and_clears_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png_fixture(&dir, "a.png");

        // First upload succeeds, so there is a stored response to clear.
        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier.clone());
        lc.select_file(&path).await.unwrap();
        lc.upload().await.unwrap();
        assert!(lc.response().is_some());

        // Swap in a failing detector for the retry.
        lc.detector = StubDetector::returning(Err(DetectError::Transport {
            detail: "HTTP 500".into(),
        }));

        let outcome = lc.upload().await.expect("guards pass");
        assert_eq!(outcome, UploadOutcome::Failed);
        assert_eq!(lc.state(), LifecycleState::Failed);
        assert!(
            lc.response().is_none(),
            "reset-on-attempt: failed retry must not show stale results"
        );
        assert!(lc.artifacts().is_empty());

        let errors = lc_errors(&notifier);
        assert_eq!(errors.last().unwrap(), "Error processing image — please try again");
        assert!(
            !errors.last().unwrap().contains("500"),
            "transport detail never reaches the user"
        );
        assert_eq!(notifier.shows.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.dismisses.load(Ordering::SeqCst), 2);
    }

    fn lc_errors(notifier: &CountingNotifier) -> Vec<String> {
        notifier.errors.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn entering_uploading_clears_previous_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png_fixture(&dir, "a.png");

        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier);
        lc.select_file(&path).await.unwrap();
        lc.upload().await.unwrap();
        assert!(lc.response().is_some());

        // Begin a new attempt and observe the clear before any resolution.
        let ticket = lc.begin_upload().expect("begin succeeds");
        assert_eq!(lc.state(), LifecycleState::Uploading);
        assert!(
            lc.response().is_none(),
            "stored patches/result are cleared the moment the attempt begins"
        );

        // Close the bracket to keep the machine consistent.
        let _ = lc.finish_upload(ticket, Ok(DetectionResponse::default()));
    }

    #[tokio::test]
    async fn stale_response_for_superseded_selection_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_png_fixture(&dir, "first.png");
        let second = write_png_fixture(&dir, "second.png");

        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier.clone());

        lc.select_file(&first).await.unwrap();
        let ticket = lc.begin_upload().expect("begin for first selection");

        // A new file is chosen while the first request is still in flight.
        lc.select_file(&second).await.unwrap();
        assert_eq!(lc.state(), LifecycleState::FileSelected);

        // The first request now resolves successfully and must be dropped.
        let outcome = lc.finish_upload(ticket, Ok(full_response()));
        assert_eq!(outcome, UploadOutcome::Stale);
        assert!(
            lc.response().is_none(),
            "stale result must not overwrite state for the newer selection"
        );
        assert_eq!(
            lc.state(),
            LifecycleState::FileSelected,
            "state untouched by the straggler"
        );
        assert_eq!(
            lc.selection().unwrap().file_name,
            "second.png",
            "the newer selection survives"
        );
        // The straggler's bracket still closes.
        assert_eq!(notifier.dismisses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_begin_while_uploading_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png_fixture(&dir, "a.png");

        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier);
        lc.select_file(&path).await.unwrap();

        let ticket = lc.begin_upload().expect("first begin");
        let err = lc.begin_upload().unwrap_err();
        assert!(matches!(err, DetectError::UploadInFlight));

        let _ = lc.finish_upload(ticket, Ok(DetectionResponse::default()));
    }

    #[tokio::test]
    async fn failed_ingest_returns_to_idle_and_notifies() {
        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier.clone());

        let err = lc.select_file("/nope/missing.png").await.unwrap_err();
        assert!(matches!(err, DetectError::FileReadFailure { .. }));
        assert_eq!(lc.state(), LifecycleState::Idle);
        assert!(lc.selection().is_none());
        assert!(lc.preview().is_none());
        assert_eq!(
            lc_errors(&notifier).as_slice(),
            ["Could not read the selected file"]
        );
    }

    #[tokio::test]
    async fn new_selection_alone_keeps_prior_results() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_png_fixture(&dir, "first.png");
        let second = write_png_fixture(&dir, "second.png");

        let detector = StubDetector::returning(Ok(full_response()));
        let notifier = Arc::new(CountingNotifier::default());
        let mut lc = lifecycle_with(detector, notifier);

        lc.select_file(&first).await.unwrap();
        lc.upload().await.unwrap();
        assert_eq!(lc.artifacts().len(), 2);

        // Selecting again replaces the image but not the displayed results;
        // those only clear when the next attempt begins.
        lc.select_file(&second).await.unwrap();
        assert_eq!(lc.state(), LifecycleState::FileSelected);
        assert_eq!(lc.artifacts().len(), 2, "prior results persist");
    }
}
