//! HTTP client for the remote Loom service.
//!
//! Stateless per call — no retries, no backoff; callers decide whether to
//! re-invoke. The remote service performs its own validation and reports
//! problems in the response body, which is surfaced verbatim.

use std::path::{Path, PathBuf};
use std::time::Duration;

use loom_common::{ResultChecker, Workflow};
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart;
use thiserror::Error;

use crate::config::ApiConfig;

/// Per-request timeout for workflow reads and writes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Archive uploads can be large on slow links.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Multipart field name the upload endpoint expects.
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service refused the request. `body` is its diagnostic,
    /// verbatim — a 200 with `success: false` lands here too.
    #[error("remote service rejected the request (HTTP {status}): {body}")]
    UploadRejected { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cannot decode workflow response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cannot read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Client for app uploads and workflow reads/writes.
#[derive(Clone)]
pub struct LoomClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl LoomClient {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, self.url(path))
            .header(AUTHORIZATION, self.config.bearer())
            .timeout(REQUEST_TIMEOUT);
        if !self.config.org_id.is_empty() {
            req = req.header("Org-Id", &self.config.org_id);
        }
        req
    }

    /// POST the packaged app archive as a single multipart file part.
    ///
    /// # Errors
    ///
    /// Any non-200 response is [`ApiError::UploadRejected`] carrying the
    /// response body verbatim.
    pub async fn upload_app(&self, archive: &Path) -> Result<(), ApiError> {
        let bytes = tokio::fs::read(archive)
            .await
            .map_err(|source| ApiError::Archive {
                path: archive.to_path_buf(),
                source,
            })?;
        let file_name = archive
            .file_name()
            .map_or_else(|| "upload.zip".to_string(), |n| n.to_string_lossy().into_owned());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .request(Method::POST, "api/v1/apps/upload")
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetch a workflow document by id.
    ///
    /// # Errors
    ///
    /// Non-200 responses are [`ApiError::UploadRejected`]; an undecodable
    /// body is [`ApiError::Decode`].
    pub async fn get_workflow(&self, id: &str) -> Result<Workflow, ApiError> {
        let response = self
            .request(Method::GET, &format!("api/v1/workflows/{id}"))
            .send()
            .await?;
        let body = check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Push a full workflow document back.
    ///
    /// The response carries a success flag that must be checked in addition
    /// to the HTTP status — a 200 with `success: false` is still a
    /// rejection.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UploadRejected`] with the body verbatim on
    /// either failure mode.
    pub async fn put_workflow(&self, workflow: &Workflow) -> Result<(), ApiError> {
        let response = self
            .request(Method::PUT, &format!("api/v1/workflows/{}", workflow.id))
            .json(workflow)
            .send()
            .await?;
        let body = check_status(response).await?;
        let result: ResultChecker = serde_json::from_str(&body)?;
        if result.success {
            Ok(())
        } else {
            Err(ApiError::UploadRejected { status: 200, body })
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    if status == 200 {
        Ok(body)
    } else {
        Err(ApiError::UploadRejected { status, body })
    }
}
