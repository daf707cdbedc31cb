//! Front ends for a [`PageState`]: a standalone HTML page and terminal text.
//!
//! The HTML page keeps the element ids and classes of the upload page
//! (`themeToggle`, `pdfPreview`, `previewText`, `submitBtn`, `results`,
//! `result-item`, …) so existing stylesheets apply. The preview canvas is
//! embedded as a base64 PNG.

use crate::error::PaperMindError;
use crate::view::{PageState, View};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const PREVIEW_PLACEHOLDER: &str = "Select a PDF to preview its first page";

const STYLE: &str = "\
body[data-theme=dark]{background:#111;color:#eee}\
body[data-theme=light]{background:#fafafa;color:#111}\
.result-item{margin:.5em 0;padding:.5em;border-left:3px solid #888}\
.result-title{font-weight:bold}\
.result-meta{opacity:.7;font-size:.9em}\
.empty-results{opacity:.7}";

/// Lossless PNG encoding of the canvas.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded canvas → {} bytes PNG", buf.len());
    Ok(buf)
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the page as a self-contained HTML document.
pub fn render_html(page: &PageState) -> Result<String, PaperMindError> {
    let mut html = String::new();
    let button = page.submit_button();

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>PaperMind</title>\n<style>{STYLE}</style>\n</head>\n\
         <body data-theme=\"{}\">\n\
         <button id=\"themeToggle\">{}</button>\n",
        page.theme(),
        html_escape(page.toggle_label()),
    );

    html.push_str("<section class=\"preview\">\n");
    if page.preview_placeholder_visible() {
        let _ = writeln!(html, "<p id=\"previewText\">{PREVIEW_PLACEHOLDER}</p>");
    }
    if let Some(canvas) = page.canvas() {
        let png = encode_png(canvas)
            .map_err(|e| PaperMindError::Internal(format!("PNG encoding failed: {e}")))?;
        let _ = writeln!(
            html,
            "<img id=\"pdfPreview\" width=\"{}\" height=\"{}\" alt=\"First page preview\" \
             src=\"data:image/png;base64,{}\">",
            canvas.width(),
            canvas.height(),
            STANDARD.encode(&png)
        );
    }
    html.push_str("</section>\n");

    let _ = writeln!(
        html,
        "<button id=\"submitBtn\"{}>{}</button>",
        if button.enabled { "" } else { " disabled" },
        html_escape(&button.label)
    );

    html.push_str("<div id=\"results\">\n");
    if let Some(msg) = page.empty_results_message() {
        let _ = writeln!(html, "<div class=\"empty-results\">{}</div>", html_escape(msg));
    }
    for item in page.results() {
        let _ = writeln!(
            html,
            "<div class=\"result-item\">\n  <div class=\"result-title\">{}</div>\n  \
             <div class=\"result-meta\">{}</div>\n</div>",
            html_escape(&item.title),
            html_escape(&item.meta)
        );
    }
    html.push_str("</div>\n</body>\n</html>\n");

    Ok(html)
}

/// Render the results list (or its placeholder) for a terminal.
pub fn render_text(page: &PageState) -> String {
    let mut out = String::new();
    if let Some(msg) = page.empty_results_message() {
        out.push_str(msg);
        out.push('\n');
        return out;
    }
    for item in page.results() {
        let _ = writeln!(out, "{}\n    {}", item.title, item.meta);
    }
    out
}

/// Write `contents` to `path` atomically (temp file + rename).
pub async fn write_output(path: &Path, contents: &[u8]) -> Result<(), PaperMindError> {
    let fail = |source| PaperMindError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}
