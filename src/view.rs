//! The view the controller paints into.
//!
//! [`View`] is the seam between the controller and whatever shows the page:
//! the in-memory [`PageState`] view-model, or a terminal front end that wraps
//! it. Controller code only ever talks to the trait.

use crate::pipeline::preview::RenderedPreview;
use crate::theme::Theme;
use image::RgbaImage;
use serde::Serialize;

/// Label of the idle submit button.
pub const SUBMIT_LABEL: &str = "Submit";

/// Label of the submit button while a request is in flight.
pub const BUSY_LABEL: &str = "Processing...";

/// Placeholder shown when the server extracted nothing.
pub const EMPTY_RESULTS_MESSAGE: &str = "No sections extracted.";

/// Alert raised when submit is pressed with no file selected.
pub const NO_FILE_ALERT: &str = "Upload a PDF first";

/// Alert raised when the upload or the response failed.
pub const SUBMIT_FAILED_ALERT: &str = "Failed to parse PDF";

/// Enabled state and label of the submit button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitButton {
    pub enabled: bool,
    pub label: String,
}

impl SubmitButton {
    pub fn idle() -> Self {
        Self {
            enabled: true,
            label: SUBMIT_LABEL.to_string(),
        }
    }

    pub fn busy() -> Self {
        Self {
            enabled: false,
            label: BUSY_LABEL.to_string(),
        }
    }
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self::idle()
    }
}

/// One rendered entry of the results list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    /// `"<rank>. <title>"`
    pub title: String,
    /// `"<document> - Page <n>"`
    pub meta: String,
}

/// Everything the controller can do to the page.
pub trait View: Send {
    /// Theme currently applied to the page.
    fn theme(&self) -> Theme;

    fn set_theme(&mut self, theme: Theme);

    fn set_toggle_label(&mut self, label: &str);

    fn hide_preview_placeholder(&mut self);

    /// Resize the canvas to the preview's viewport and paint its pixels.
    fn paint_preview(&mut self, preview: RenderedPreview);

    fn submit_button(&self) -> SubmitButton;

    fn set_submit_button(&mut self, button: SubmitButton);

    /// Blocking, user-visible message.
    fn alert(&mut self, message: &str);

    fn clear_results(&mut self);

    fn show_empty_results(&mut self, message: &str);

    fn append_result(&mut self, item: ResultItem);
}

/// In-memory page: the view-model every front end renders from.
#[derive(Debug, Clone)]
pub struct PageState {
    theme: Theme,
    toggle_label: String,
    preview_placeholder: bool,
    canvas: Option<RgbaImage>,
    submit_button: SubmitButton,
    alerts: Vec<String>,
    empty_results: Option<String>,
    results: Vec<ResultItem>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            toggle_label: String::new(),
            preview_placeholder: true,
            canvas: None,
            submit_button: SubmitButton::idle(),
            alerts: Vec::new(),
            empty_results: None,
            results: Vec::new(),
        }
    }
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_label(&self) -> &str {
        &self.toggle_label
    }

    pub fn preview_placeholder_visible(&self) -> bool {
        self.preview_placeholder
    }

    /// Painted preview pixels; the canvas size is the image size.
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Alerts raised so far, oldest first.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn empty_results_message(&self) -> Option<&str> {
        self.empty_results.as_deref()
    }

    pub fn results(&self) -> &[ResultItem] {
        &self.results
    }
}

impl View for PageState {
    fn theme(&self) -> Theme {
        self.theme
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    fn set_toggle_label(&mut self, label: &str) {
        self.toggle_label = label.to_string();
    }

    fn hide_preview_placeholder(&mut self) {
        self.preview_placeholder = false;
    }

    fn paint_preview(&mut self, preview: RenderedPreview) {
        self.canvas = Some(preview.image);
    }

    fn submit_button(&self) -> SubmitButton {
        self.submit_button.clone()
    }

    fn set_submit_button(&mut self, button: SubmitButton) {
        self.submit_button = button;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn clear_results(&mut self) {
        self.empty_results = None;
        self.results.clear();
    }

    fn show_empty_results(&mut self, message: &str) {
        self.empty_results = Some(message.to_string());
    }

    fn append_result(&mut self, item: ResultItem) {
        self.results.push(item);
    }
}
