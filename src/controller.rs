//! The upload page controller.
//!
//! [`UploadController`] owns the page's collaborators (view, preference
//! store, parse service, renderer) and implements the user actions on top of
//! them: load, theme toggle, file selection with preview, and submit.
//!
//! Every action takes `&self`, so a preview and a submit can be in flight at
//! the same time (see [`UploadController::preview_and_submit`]). The view and
//! the store sit behind mutexes that are only held for synchronous updates,
//! never across an `.await`.

use crate::config::ClientConfig;
use crate::error::{PreviewError, SubmitError};
use crate::pipeline::input::SelectedFile;
use crate::pipeline::preview::{render_preview, DocumentRenderer, Viewport};
use crate::pipeline::results::{render_results, ParseResponse};
use crate::pipeline::submit::ParseService;
use crate::theme::{load_theme, save_theme, PreferenceStore, Theme};
use crate::view::{SubmitButton, View, NO_FILE_ALERT, SUBMIT_FAILED_ALERT};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-enables the submit button when dropped, so a submit future that is
/// cancelled mid-request does not leave the page stuck in the busy state.
struct BusyButton<'a, V: View> {
    view: &'a Mutex<V>,
}

impl<V: View> Drop for BusyButton<'_, V> {
    fn drop(&mut self) {
        lock(self.view).set_submit_button(SubmitButton::idle());
    }
}

/// Controller for one upload page.
pub struct UploadController<V, S, P> {
    view: Mutex<V>,
    store: Mutex<S>,
    service: P,
    renderer: Arc<dyn DocumentRenderer>,
    container_width: u32,
    selected: Mutex<Option<SelectedFile>>,
    preview_ticket: AtomicU64,
}

impl<V, S, P> UploadController<V, S, P>
where
    V: View,
    S: PreferenceStore,
    P: ParseService,
{
    pub fn new(
        config: &ClientConfig,
        view: V,
        store: S,
        service: P,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            view: Mutex::new(view),
            store: Mutex::new(store),
            service,
            renderer,
            container_width: config.container_width,
            selected: Mutex::new(None),
            preview_ticket: AtomicU64::new(0),
        }
    }

    // ── Theme ────────────────────────────────────────────────────────────

    /// Page-load initialisation: apply the stored theme (dark by default)
    /// and label the toggle.
    pub fn load(&self) -> Theme {
        let theme = load_theme(&*lock(&self.store));
        self.apply_theme(theme);
        debug!("Applied stored theme '{theme}'");
        theme
    }

    /// Switch to the opposite of the applied theme and persist it.
    pub fn toggle_theme(&self) -> Theme {
        let next = self.applied_theme().opposite();
        self.apply_theme(next);
        save_theme(&mut *lock(&self.store), next);
        info!("Theme switched to '{next}'");
        next
    }

    pub fn applied_theme(&self) -> Theme {
        lock(&self.view).theme()
    }

    fn apply_theme(&self, theme: Theme) {
        let mut view = lock(&self.view);
        view.set_theme(theme);
        view.set_toggle_label(theme.toggle_label());
    }

    // ── Selection & preview ──────────────────────────────────────────────

    /// Select `path` and preview it, like changing the file input.
    pub async fn select_file(&self, path: impl AsRef<Path>) -> Result<Viewport, PreviewError> {
        let path = path.as_ref();
        let file = SelectedFile::open(path).map_err(|source| {
            let e = PreviewError::Read {
                path: path.to_path_buf(),
                source,
            };
            error!("PDF preview error: {e}");
            e
        })?;
        self.set_selection(file);

        self.preview()
            .await?
            .ok_or_else(|| PreviewError::Internal("selection vanished before preview".into()))
    }

    /// Replace the selection without previewing it.
    pub fn set_selection(&self, file: SelectedFile) {
        *lock(&self.selected) = Some(file);
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        lock(&self.selected).clone()
    }

    pub fn clear_selection(&self) {
        *lock(&self.selected) = None;
    }

    /// Render the selected file's first page into the canvas.
    ///
    /// Returns `Ok(None)` when nothing is selected. Failures are logged and
    /// leave the canvas untouched; they are never alerted. If another preview
    /// is started before this one finishes, this one is dropped with
    /// [`PreviewError::Superseded`] instead of being painted.
    pub async fn preview(&self) -> Result<Option<Viewport>, PreviewError> {
        let Some(file) = self.selected_file() else {
            return Ok(None);
        };
        let ticket = self.preview_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        lock(&self.view).hide_preview_placeholder();

        let outcome = match file.read().await {
            Ok(bytes) => render_preview(Arc::clone(&self.renderer), bytes, self.container_width).await,
            Err(source) => Err(PreviewError::Read {
                path: file.path().to_path_buf(),
                source,
            }),
        };

        let rendered = outcome.inspect_err(|e| error!("PDF preview error: {e}"))?;

        if self.preview_ticket.load(Ordering::SeqCst) != ticket {
            debug!("Discarding stale preview of {}", file.name());
            return Err(PreviewError::Superseded);
        }

        let viewport = rendered.viewport;
        lock(&self.view).paint_preview(rendered);
        info!(
            "Previewed {} at {}x{}",
            file.name(),
            viewport.canvas_size().0,
            viewport.canvas_size().1
        );
        Ok(Some(viewport))
    }

    // ── Submit ───────────────────────────────────────────────────────────

    /// Upload the selected file and render the returned sections.
    ///
    /// With no file selected this raises the "Upload a PDF first" alert and
    /// sends nothing. While the request runs the submit button is disabled
    /// and relabelled; it is restored whatever the outcome, including when the
    /// returned future is dropped before it finishes. A submit issued
    /// while the button is disabled is ignored with [`SubmitError::Busy`].
    pub async fn submit(&self) -> Result<ParseResponse, SubmitError> {
        let Some(file) = self.selected_file() else {
            lock(&self.view).alert(NO_FILE_ALERT);
            return Err(SubmitError::NoFileSelected);
        };

        let _restore = {
            let mut view = lock(&self.view);
            if !view.submit_button().enabled {
                debug!("Submit ignored: request already in flight");
                return Err(SubmitError::Busy);
            }
            view.set_submit_button(SubmitButton::busy());
            BusyButton { view: &self.view }
        };

        let outcome = self.service.parse(&file).await;

        {
            let mut view = lock(&self.view);
            match &outcome {
                Ok(response) => {
                    info!(
                        "Received {} sections for {}",
                        response.sections().len(),
                        file.name()
                    );
                    render_results(response, &mut *view);
                }
                Err(e) => {
                    error!("Submit failed: {e}");
                    view.alert(SUBMIT_FAILED_ALERT);
                }
            }
        }

        outcome
    }

    /// Run the preview and the submit for the current selection concurrently.
    pub async fn preview_and_submit(
        &self,
    ) -> (
        Result<Option<Viewport>, PreviewError>,
        Result<ParseResponse, SubmitError>,
    ) {
        futures::join!(self.preview(), self.submit())
    }

    // ── View access ──────────────────────────────────────────────────────

    /// Inspect the view.
    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&lock(&self.view))
    }

    /// Inspect the preference store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock(&self.store))
    }

    pub fn into_view(self) -> V {
        self.view.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preview::RenderedPreview;
    use crate::pipeline::results::ExtractedSection;
    use crate::theme::{MemoryStore, THEME_KEY};
    use crate::view::{PageState, EMPTY_RESULTS_MESSAGE};
    use image::{Rgba, RgbaImage};
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    /// Page size is encoded in the file: `slow` files take 200 ms and are
    /// 10 px tall, `bad` files fail, anything else is 20 px tall.
    struct ScriptedRenderer;

    impl DocumentRenderer for ScriptedRenderer {
        fn render_first_page(
            &self,
            bytes: &[u8],
            container_width: u32,
        ) -> Result<RenderedPreview, PreviewError> {
            let height = if bytes.starts_with(b"slow") {
                std::thread::sleep(Duration::from_millis(200));
                10.0
            } else if bytes.starts_with(b"bad") {
                return Err(PreviewError::Parse("not a document".into()));
            } else {
                20.0
            };
            let viewport = Viewport::fit_width(f64::from(container_width), height, container_width)?;
            let (w, h) = viewport.canvas_size();
            Ok(RenderedPreview {
                viewport,
                image: RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255])),
            })
        }
    }

    struct CannedService {
        reply: Result<ParseResponse, String>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CannedService {
        fn ok(reply: ParseResponse) -> Self {
            Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("connection reset".into()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    impl ParseService for CannedService {
        async fn parse(&self, _file: &SelectedFile) -> Result<ParseResponse, SubmitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(|reason| SubmitError::Network {
                url: "http://test/api/parse".into(),
                reason,
            })
        }
    }

    type TestController = UploadController<PageState, MemoryStore, CannedService>;

    fn controller(service: CannedService) -> TestController {
        let config = ClientConfig::builder().container_width(100).build().unwrap();
        UploadController::new(
            &config,
            PageState::new(),
            MemoryStore::new(),
            service,
            Arc::new(ScriptedRenderer),
        )
    }

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    fn two_sections() -> ParseResponse {
        ParseResponse {
            extracted_sections: Some(vec![
                ExtractedSection::new(2, "Intro", "a.pdf", 1),
                ExtractedSection::new(1, "Methods", "a.pdf", 3),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn load_without_preference_is_dark_with_light_label() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        assert_eq!(c.load(), Theme::Dark);
        c.with_view(|v| {
            assert_eq!(v.theme(), Theme::Dark);
            assert_eq!(v.toggle_label(), "Light mode");
        });
    }

    #[test]
    fn load_applies_stored_light_theme() {
        let config = ClientConfig::default();
        let mut store = MemoryStore::new();
        store.set(THEME_KEY, "light").unwrap();
        let c = UploadController::new(
            &config,
            PageState::new(),
            store,
            CannedService::ok(ParseResponse::default()),
            Arc::new(ScriptedRenderer),
        );
        assert_eq!(c.load(), Theme::Light);
        c.with_view(|v| assert_eq!(v.toggle_label(), "Dark mode"));
    }

    #[test]
    fn toggling_twice_restores_theme_and_stored_value() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        c.load();
        let stored = || c.with_store(|s| s.get(THEME_KEY).unwrap());

        assert_eq!(c.toggle_theme(), Theme::Light);
        assert_eq!(stored().as_deref(), Some("light"));
        c.with_view(|v| assert_eq!(v.toggle_label(), "Dark mode"));

        assert_eq!(c.toggle_theme(), Theme::Dark);
        assert_eq!(stored().as_deref(), Some("dark"));
        assert_eq!(c.applied_theme(), Theme::Dark);
        c.with_view(|v| assert_eq!(v.toggle_label(), "Light mode"));
    }

    #[tokio::test]
    async fn submit_without_file_alerts_and_sends_nothing() {
        let c = controller(CannedService::ok(two_sections()));
        let err = c.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::NoFileSelected));
        assert_eq!(c.service.calls.load(Ordering::SeqCst), 0);
        c.with_view(|v| {
            assert_eq!(v.alerts(), ["Upload a PDF first"]);
            assert_eq!(v.submit_button(), SubmitButton::idle());
        });
    }

    #[tokio::test]
    async fn submit_renders_sections_in_server_order_and_resets_button() {
        let c = controller(CannedService::ok(two_sections()));
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();

        let resp = c.submit().await.unwrap();
        assert_eq!(resp.sections().len(), 2);

        c.with_view(|v| {
            let titles: Vec<&str> = v.results().iter().map(|r| r.title.as_str()).collect();
            assert_eq!(titles, ["2. Intro", "1. Methods"]);
            assert_eq!(v.submit_button(), SubmitButton::idle());
            assert!(v.alerts().is_empty());
        });
    }

    #[tokio::test]
    async fn empty_reply_shows_only_placeholder() {
        let reply = ParseResponse {
            extracted_sections: Some(vec![]),
            ..Default::default()
        };
        let c = controller(CannedService::ok(reply));
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();
        c.submit().await.unwrap();

        c.with_view(|v| {
            assert_eq!(v.empty_results_message(), Some(EMPTY_RESULTS_MESSAGE));
            assert!(v.results().is_empty());
        });
    }

    #[tokio::test]
    async fn failed_submit_alerts_and_resets_button() {
        let c = controller(CannedService::failing());
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();

        let err = c.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Network { .. }));
        c.with_view(|v| {
            assert_eq!(v.alerts(), ["Failed to parse PDF"]);
            let button = v.submit_button();
            assert!(button.enabled);
            assert_eq!(button.label, "Submit");
        });
    }

    #[tokio::test]
    async fn second_submit_while_busy_is_ignored() {
        let mut service = CannedService::ok(two_sections());
        service.delay = Duration::from_millis(50);
        let c = controller(service);
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();

        let (first, second) = futures::join!(c.submit(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c.with_view(|v| assert_eq!(v.submit_button(), SubmitButton::busy()));
            c.submit().await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(SubmitError::Busy)));
        assert_eq!(c.service.calls.load(Ordering::SeqCst), 1);
        c.with_view(|v| assert_eq!(v.submit_button(), SubmitButton::idle()));
    }

    #[tokio::test]
    async fn abandoned_submit_restores_the_button() {
        let mut service = CannedService::ok(two_sections());
        service.delay = Duration::from_secs(5);
        let c = controller(service);
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();

        let first = tokio::time::timeout(Duration::from_millis(50), c.submit()).await;
        assert!(first.is_err());
        c.with_view(|v| assert_eq!(v.submit_button(), SubmitButton::idle()));

        // The next submit reaches the service instead of bouncing off `Busy`.
        let second = tokio::time::timeout(Duration::from_millis(50), c.submit()).await;
        assert!(second.is_err());
        assert_eq!(c.service.calls.load(Ordering::SeqCst), 2);
        c.with_view(|v| {
            assert_eq!(v.submit_button(), SubmitButton::idle());
            assert!(v.alerts().is_empty());
        });
    }

    #[tokio::test]
    async fn selecting_a_file_paints_the_canvas() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        let f = file_with(b"%PDF-1.4");
        let viewport = c.select_file(f.path()).await.unwrap();

        assert_eq!(viewport.canvas_size(), (100, 20));
        c.with_view(|v| {
            assert!(!v.preview_placeholder_visible());
            assert_eq!(v.canvas().unwrap().dimensions(), (100, 20));
        });
    }

    #[tokio::test]
    async fn failed_preview_keeps_previous_canvas_and_does_not_alert() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        let good = file_with(b"%PDF-1.4");
        let bad = file_with(b"bad bytes");

        c.select_file(good.path()).await.unwrap();
        let err = c.select_file(bad.path()).await.unwrap_err();

        assert!(matches!(err, PreviewError::Parse(_)));
        c.with_view(|v| {
            assert_eq!(v.canvas().unwrap().dimensions(), (100, 20));
            assert!(v.alerts().is_empty());
        });
    }

    #[tokio::test]
    async fn latest_selection_wins_over_slower_earlier_one() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        let slow = file_with(b"slow");
        let fast = file_with(b"%PDF-1.4");

        let (first, second) = futures::join!(c.select_file(slow.path()), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            c.select_file(fast.path()).await
        });

        assert!(matches!(first, Err(PreviewError::Superseded)));
        assert!(second.is_ok());
        c.with_view(|v| assert_eq!(v.canvas().unwrap().dimensions(), (100, 20)));
    }

    #[tokio::test]
    async fn preview_without_selection_is_a_no_op() {
        let c = controller(CannedService::ok(ParseResponse::default()));
        assert!(c.preview().await.unwrap().is_none());
        c.with_view(|v| assert!(v.preview_placeholder_visible()));
    }

    #[tokio::test]
    async fn preview_and_submit_run_together() {
        let c = controller(CannedService::ok(two_sections()));
        let f = file_with(b"%PDF-1.4");
        c.select_file(f.path()).await.unwrap();
        c.clear_selection();
        assert!(c.selected_file().is_none());

        c.select_file(f.path()).await.unwrap();
        let (preview, submit) = c.preview_and_submit().await;
        assert!(preview.unwrap().is_some());
        assert_eq!(submit.unwrap().sections().len(), 2);

        let page = c.into_view();
        assert_eq!(page.results().len(), 2);
        assert!(page.canvas().is_some());
    }
}
