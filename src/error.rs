//! Error types for the PaperMind client.
//!
//! The two user actions fail in different ways, so each gets its own type:
//!
//! * [`PreviewError`] — the first-page preview could not be produced. These
//!   are logged and returned to the caller but never shown to the user; the
//!   view keeps whatever it displayed before.
//!
//! * [`SubmitError`] — the upload or the server reply failed. The controller
//!   turns these into a blocking alert.
//!
//! [`PaperMindError`] covers setup failures (bad configuration, unusable
//! preference file, engine binding) and output writing.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal setup and output errors.
#[derive(Debug, Error)]
pub enum PaperMindError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The preference file exists but could not be read or written.
    #[error("Preference store '{path}' is unusable: {detail}")]
    Storage { path: PathBuf, detail: String },

    /// The rendering engine could not be provisioned.
    #[error(transparent)]
    Engine(#[from] pdfium_engine::EngineError),

    /// Could not write a report or preview image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a preview could not be painted.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The selected file could not be read.
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a document the renderer understands.
    #[error("Document could not be parsed: {0}")]
    Parse(String),

    /// The document has no first page.
    #[error("Document has no pages")]
    Empty,

    /// Rasterisation of the first page failed.
    #[error("Rendering page 1 failed: {0}")]
    Render(String),

    /// The pdfium library is unavailable.
    #[error("Rendering engine unavailable: {0}")]
    Engine(String),

    /// A newer preview was started before this one finished.
    #[error("Preview superseded by a newer selection")]
    Superseded,

    /// Unexpected internal error (e.g. the blocking task panicked).
    #[error("Internal preview error: {0}")]
    Internal(String),
}

/// Why a submit did not produce a rendered result list.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submit was requested with no file selected.
    #[error("No file selected")]
    NoFileSelected,

    /// A submit is already in flight.
    #[error("A submit is already in progress")]
    Busy,

    /// The selected file could not be read for upload.
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connection, TLS or transport failure.
    #[error("Request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    /// The server did not answer within the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The body was not the expected JSON document.
    #[error("Server response could not be parsed (HTTP {status}): {detail}")]
    InvalidResponse { status: u16, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_mentions_url_and_secs() {
        let e = SubmitError::Timeout {
            url: "http://localhost:8000/api/parse".into(),
            secs: 30,
        };
        let msg = e.to_string();
        assert!(msg.contains("/api/parse"), "got: {msg}");
        assert!(msg.contains("30s"), "got: {msg}");
    }

    #[test]
    fn invalid_response_display_has_status() {
        let e = SubmitError::InvalidResponse {
            status: 502,
            detail: "expected value at line 1 column 1".into(),
        };
        assert!(e.to_string().contains("HTTP 502"));
    }

    #[test]
    fn engine_error_is_transparent() {
        let inner = pdfium_engine::EngineError::Extract("'lib/libpdfium.so' not found".into());
        let e: PaperMindError = inner.into();
        assert!(e.to_string().contains("libpdfium.so"));
    }

    #[test]
    fn preview_read_error_names_path() {
        let e = PreviewError::Read {
            path: PathBuf::from("/tmp/missing.pdf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(e.to_string().contains("missing.pdf"));
    }
}
