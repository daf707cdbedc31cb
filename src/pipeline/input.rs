//! The user's file selection.
//!
//! A [`SelectedFile`] only remembers where the file is and what it looks
//! like. Its bytes are read afresh by each action that needs them (preview,
//! submit), so the selection never holds a copy of the document.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// MIME type sent for files with a `.pdf` extension.
pub const PDF_MIME: &str = "application/pdf";

/// A file chosen for preview and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    path: PathBuf,
    name: String,
    mime: &'static str,
    len: u64,
}

impl SelectedFile {
    /// Select the file at `path`.
    ///
    /// Fails only if the path is not a readable regular file. The type and
    /// size are not validated.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let mime = guess_mime(&path);
        debug!("Selected {} ({}, {} bytes)", name, mime, meta.len());

        Ok(Self {
            path,
            name,
            mime,
            len: meta.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, as sent in the upload.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// Size in bytes at selection time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the whole file into memory.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        let bytes = tokio::fs::read(&self.path).await?;
        if !has_pdf_magic(&bytes) {
            warn!(
                "'{}' does not start with %PDF; continuing anyway",
                self.path.display()
            );
        }
        Ok(bytes)
    }
}

/// MIME type from the file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MIME,
        _ => "application/octet-stream",
    }
}

/// `true` when `bytes` start with the `%PDF` header.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
