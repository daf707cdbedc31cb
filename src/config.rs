//! Client configuration.
//!
//! Everything the controller needs to know about its surroundings lives in
//! [`ClientConfig`]: where the parse service is, how wide the preview
//! container is, where the theme preference is kept and which pdfium library
//! to use. Build it with [`ClientConfig::builder`]; unset fields keep the
//! defaults documented below.

use crate::error::PaperMindError;
use pdfium_engine::EngineLocator;
use std::path::PathBuf;

/// Configuration for an [`crate::controller::UploadController`].
///
/// # Example
/// ```rust
/// use papermind::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .server_url("http://localhost:8000")
///     .container_width(640)
///     .build()
///     .unwrap();
/// assert_eq!(config.parse_url(), "http://localhost:8000/api/parse");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the PaperMind service. Default: `http://127.0.0.1:8000`.
    pub server_url: String,

    /// Path of the parse endpoint, relative to `server_url`. Default: `/api/parse`.
    pub parse_endpoint: String,

    /// Multipart field the file is attached under. Default: `file`.
    pub file_field: String,

    /// Whole-request timeout for a submit, in seconds. Default: 300.
    ///
    /// Section ranking runs synchronously on the server, so large documents
    /// routinely take over a minute.
    pub request_timeout_secs: u64,

    /// Width of the preview container in pixels. Default: 800.
    ///
    /// The first page is scaled so its width matches this exactly.
    pub container_width: u32,

    /// JSON file holding the theme preference.
    /// If None, uses `<config dir>/papermind/preferences.json`.
    pub preference_path: Option<PathBuf>,

    /// Existing pdfium library to bind instead of the cached download.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Root directory for the downloaded pdfium engine.
    pub pdfium_cache_root: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            parse_endpoint: "/api/parse".to_string(),
            file_field: "file".to_string(),
            request_timeout_secs: 300,
            container_width: 800,
            preference_path: None,
            pdfium_lib_path: None,
            pdfium_cache_root: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Absolute URL of the parse endpoint.
    pub fn parse_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let path = self.parse_endpoint.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Preference file in effect, falling back to the per-user config dir.
    pub fn preference_path(&self) -> PathBuf {
        self.preference_path
            .clone()
            .unwrap_or_else(default_preference_path)
    }

    /// Engine locator honouring the configured overrides, then the environment.
    pub fn engine_locator(&self) -> EngineLocator {
        let mut locator = EngineLocator::from_env();
        if let Some(ref p) = self.pdfium_lib_path {
            locator = locator.with_lib_path(p);
        }
        if let Some(ref p) = self.pdfium_cache_root {
            locator = locator.with_cache_root(p);
        }
        locator
    }
}

/// `<config dir>/papermind/preferences.json`, or the temp dir when the
/// platform has no config directory.
pub fn default_preference_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(std::env::temp_dir)
        .join("papermind")
        .join("preferences.json")
}

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    pub fn parse_endpoint(mut self, path: impl Into<String>) -> Self {
        self.config.parse_endpoint = path.into();
        self
    }

    pub fn file_field(mut self, name: impl Into<String>) -> Self {
        self.config.file_field = name.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn container_width(mut self, px: u32) -> Self {
        self.config.container_width = px;
        self
    }

    pub fn preference_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.preference_path = Some(path.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn pdfium_cache_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_cache_root = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, PaperMindError> {
        let c = &self.config;
        if !is_url(&c.server_url) {
            return Err(PaperMindError::InvalidConfig(format!(
                "server URL must start with http:// or https://, got '{}'",
                c.server_url
            )));
        }
        if c.parse_endpoint.trim_matches('/').is_empty() {
            return Err(PaperMindError::InvalidConfig(
                "parse endpoint must not be empty".into(),
            ));
        }
        if c.file_field.is_empty() {
            return Err(PaperMindError::InvalidConfig(
                "multipart field name must not be empty".into(),
            ));
        }
        if c.container_width == 0 {
            return Err(PaperMindError::InvalidConfig(
                "container width must be ≥ 1 px".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(PaperMindError::InvalidConfig(
                "request timeout must be ≥ 1 s".into(),
            ));
        }
        Ok(self.config)
    }
}
