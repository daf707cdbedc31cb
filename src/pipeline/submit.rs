//! Upload to the parse service.
//!
//! One multipart POST per submit, file attached under a single field, reply
//! decoded as JSON. There is no retry: a failed submit is reported once and
//! the user starts over.
//!
//! The HTTP status is logged but not enforced. A non-2xx reply whose body is
//! still a JSON object is decoded like any other; one without sections then
//! simply renders as "no sections".

use crate::config::ClientConfig;
use crate::error::{PaperMindError, SubmitError};
use crate::pipeline::input::SelectedFile;
use crate::pipeline::results::ParseResponse;
use reqwest::multipart::{Form, Part};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Something that turns an uploaded file into a [`ParseResponse`].
pub trait ParseService: Send + Sync {
    fn parse(
        &self,
        file: &SelectedFile,
    ) -> impl Future<Output = Result<ParseResponse, SubmitError>> + Send;
}

/// The PaperMind HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpParseService {
    client: reqwest::Client,
    url: String,
    field: String,
    timeout_secs: u64,
}

impl HttpParseService {
    pub fn new(config: &ClientConfig) -> Result<Self, PaperMindError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("papermind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaperMindError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.parse_url(),
            field: config.file_field.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, e: reqwest::Error) -> SubmitError {
        if e.is_timeout() {
            SubmitError::Timeout {
                url: self.url.clone(),
                secs: self.timeout_secs,
            }
        } else {
            SubmitError::Network {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

impl ParseService for HttpParseService {
    async fn parse(&self, file: &SelectedFile) -> Result<ParseResponse, SubmitError> {
        let bytes = file.read().await.map_err(|source| SubmitError::Read {
            path: file.path().to_path_buf(),
            source,
        })?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file.name().to_string())
            .mime_str(file.mime())
            .map_err(|e| self.transport_error(e))?;
        let form = Form::new().part(self.field.clone(), part);

        info!("Uploading {} ({} bytes) to {}", file.name(), size, self.url);
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Parse service answered HTTP {status}");
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        debug!("Received {} byte reply", body.len());

        serde_json::from_slice(&body).map_err(|e| SubmitError::InvalidResponse {
            status: status.as_u16(),
            detail: e.to_string(),
        })
    }
}
