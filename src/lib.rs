//! # papermind
//!
//! Client for the PaperMind document service: preview a PDF's first page,
//! submit the file to `POST /api/parse`, and render the ranked sections the
//! service extracts. A light/dark theme preference is kept between runs.
//!
//! ## Flow
//!
//! ```text
//!              ┌──────────────── UploadController ─────────────────┐
//!  select ────▶│ input ─▶ preview (pdfium, spawn_blocking) ─▶ canvas │
//!  submit ────▶│ input ─▶ submit (multipart POST) ─▶ results ─▶ list │
//!  toggle ────▶│ theme ◀──▶ PreferenceStore                          │
//!              └───────────────────────┬────────────────────────────┘
//!                                      ▼
//!                           View (PageState / terminal)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use papermind::{
//!     ClientConfig, FileStore, HttpParseService, PageState, PdfiumRenderer, UploadController,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder().server_url("http://localhost:8000").build()?;
//!     let controller = UploadController::new(
//!         &config,
//!         PageState::new(),
//!         FileStore::new(config.preference_path()),
//!         HttpParseService::new(&config)?,
//!         Arc::new(PdfiumRenderer::new(config.engine_locator())),
//!     );
//!     controller.load();
//!     controller.select_file("paper.pdf").await?;
//!     let response = controller.submit().await?;
//!     for section in response.sections() {
//!         println!("{}", section.to_item().title);
//!     }
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod theme;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::ClientConfig;
pub use config::ClientConfigBuilder;
pub use controller::UploadController;
pub use error::{PaperMindError, PreviewError, SubmitError};
pub use pipeline::input::SelectedFile;
pub use pipeline::preview::{DocumentRenderer, PdfiumRenderer, RenderedPreview, Viewport};
pub use pipeline::results::{ExtractedSection, ParseResponse};
pub use pipeline::submit::{HttpParseService, ParseService};
pub use theme::{FileStore, MemoryStore, PreferenceStore, Theme};
pub use view::{PageState, ResultItem, SubmitButton, View};
