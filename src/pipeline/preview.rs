//! First-page preview: bytes → page 1 → canvas pixels.
//!
//! The page is scaled so its width fills the preview container exactly:
//! `scale = container_width / page_width_at_scale_1`. The canvas takes the
//! scaled viewport's dimensions, truncated to whole pixels.
//!
//! Rendering goes through [`DocumentRenderer`]. The production renderer wraps
//! pdfium, which is blocking and not async-safe, so [`render_preview`] always
//! runs the renderer on tokio's blocking pool.

use crate::error::{PaperMindError, PreviewError};
use image::RgbaImage;
use pdfium_engine::{DownloadProgress, EngineLocator};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// A page's pixel dimensions at a given scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Viewport of a page whose unscaled size is `page_width × page_height`.
    pub fn at_scale(page_width: f64, page_height: f64, scale: f64) -> Self {
        Self {
            scale,
            width: page_width * scale,
            height: page_height * scale,
        }
    }

    /// Viewport whose width equals `container_width`.
    pub fn fit_width(
        page_width: f64,
        page_height: f64,
        container_width: u32,
    ) -> Result<Self, PreviewError> {
        if !(page_width > 0.0 && page_height > 0.0) {
            return Err(PreviewError::Render(format!(
                "page has no area ({page_width}×{page_height})"
            )));
        }
        let unscaled = Self::at_scale(page_width, page_height, 1.0);
        let scale = f64::from(container_width) / unscaled.width;
        Ok(Self::at_scale(page_width, page_height, scale))
    }

    /// Canvas dimensions: the viewport truncated to whole pixels, at least 1×1.
    pub fn canvas_size(&self) -> (u32, u32) {
        (to_canvas_px(self.width), to_canvas_px(self.height))
    }
}

// The epsilon absorbs the error of `(w / page_w) * page_w` so a fitted width
// of 800 never truncates to 799.
fn to_canvas_px(v: f64) -> u32 {
    ((v + 1e-6).floor() as u32).max(1)
}

/// A painted first page, ready for the canvas.
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    pub viewport: Viewport,
    pub image: RgbaImage,
}

/// Parses a document and rasterises its first page.
///
/// Implementations may block; callers go through [`render_preview`].
pub trait DocumentRenderer: Send + Sync + 'static {
    fn render_first_page(
        &self,
        bytes: &[u8],
        container_width: u32,
    ) -> Result<RenderedPreview, PreviewError>;
}

/// Run `renderer` on the blocking pool.
pub async fn render_preview(
    renderer: Arc<dyn DocumentRenderer>,
    bytes: Vec<u8>,
    container_width: u32,
) -> Result<RenderedPreview, PreviewError> {
    tokio::task::spawn_blocking(move || renderer.render_first_page(&bytes, container_width))
        .await
        .map_err(|e| PreviewError::Internal(format!("Render task panicked: {e}")))?
}

/// pdfium-backed renderer.
///
/// The library path is resolved once (downloading the engine on first use)
/// and bound afresh for every render.
#[derive(Debug)]
pub struct PdfiumRenderer {
    locator: EngineLocator,
    library: OnceLock<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(locator: EngineLocator) -> Self {
        Self {
            locator,
            library: OnceLock::new(),
        }
    }

    /// Make sure the engine is on disk, reporting download progress.
    ///
    /// Optional: the first render does the same silently.
    pub fn prepare(
        &self,
        on_progress: Option<DownloadProgress<'_>>,
    ) -> Result<PathBuf, PaperMindError> {
        if let Some(p) = self.library.get() {
            return Ok(p.clone());
        }
        let path = self.locator.ensure(on_progress)?;
        let _ = self.library.set(path.clone());
        Ok(path)
    }

    fn bind(&self) -> Result<Pdfium, PreviewError> {
        let engine_unavailable = |e: PaperMindError| PreviewError::Engine(e.to_string());
        let path = self.prepare(None).map_err(engine_unavailable)?;
        pdfium_engine::bind_library(&path).map_err(|e| engine_unavailable(e.into()))
    }
}

impl DocumentRenderer for PdfiumRenderer {
    fn render_first_page(
        &self,
        bytes: &[u8],
        container_width: u32,
    ) -> Result<RenderedPreview, PreviewError> {
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.to_ascii_lowercase().contains("password") {
                PreviewError::Parse("document is password protected".into())
            } else {
                PreviewError::Parse(detail)
            }
        })?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(PreviewError::Empty);
        }
        info!("Document loaded: {} pages", pages.len());

        let page = pages
            .get(0)
            .map_err(|e| PreviewError::Render(format!("{:?}", e)))?;

        let viewport = Viewport::fit_width(
            f64::from(page.width().value),
            f64::from(page.height().value),
            container_width,
        )?;
        let (width, height) = viewport.canvas_size();

        let render_config = PdfRenderConfig::new().set_target_size(width as i32, height as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PreviewError::Render(format!("{:?}", e)))?;

        let image = bitmap.as_image().into_rgba8();
        debug!(
            "Rendered page 1 at scale {:.3} → {}x{} px",
            viewport.scale,
            image.width(),
            image.height()
        );

        Ok(RenderedPreview { viewport, image })
    }
}
