//! Pipeline stages behind the two user actions.
//!
//! ```text
//! preview:  input ──▶ preview ──▶ view (canvas)
//!           (bytes)   (pdfium)
//!
//! submit:   input ──▶ submit ──▶ results ──▶ view (list)
//!           (bytes)   (HTTP)     (JSON)
//! ```
//!
//! 1. [`input`]   — the selected file; bytes are read per action
//! 2. [`preview`] — viewport maths and first-page rasterisation; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`submit`]  — multipart upload to the parse service; the only stage
//!    with network I/O
//! 4. [`results`] — the service's JSON reply and its list rendering

pub mod input;
pub mod preview;
pub mod results;
pub mod submit;
