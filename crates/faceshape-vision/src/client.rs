//! HTTP client for the `images:annotate` endpoint.

use crate::annotate::{AnnotateRequest, AnnotateResponse};
use crate::credential::{Credential, CredentialError};
use faceshape_core::Point;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

const QUOTA_PROJECT_HEADER: &str = "x-goog-user-project";

#[derive(Debug, Error)]
pub enum VisionError {
    /// Network, TLS or body decoding failure.
    #[error("vision request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx status from the endpoint.
    #[error("vision API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The service accepted the request but rejected the image.
    #[error("vision rejected image (code {code}): {message}")]
    Image { code: i32, message: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Face-detection client for a single endpoint.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    quota_project: Option<String>,
}

impl VisionClient {
    /// Build a client with its own connection pool and request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, VisionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoint))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            quota_project: None,
        }
    }

    /// Bill requests to `project` rather than the credential's default.
    pub fn with_quota_project(mut self, project: impl Into<String>) -> Self {
        self.quota_project = Some(project.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Underlying HTTP client, shared with the credential exchange.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Run face detection on raw image bytes.
    pub async fn annotate(
        &self,
        credential: &Credential,
        image: &[u8],
    ) -> Result<AnnotateResponse, VisionError> {
        let token = credential.access_token(&self.http).await?;

        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&AnnotateRequest::single_face(image));
        if let Some(project) = &self.quota_project {
            request = request.header(QUOTA_PROJECT_HEADER, project);
        }

        tracing::debug!(endpoint = %self.endpoint, bytes = image.len(), "annotating image");
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<AnnotateResponse>().await?)
    }

    /// Landmarks of the most prominent face, or `None` when no face was found.
    pub async fn detect_landmarks(
        &self,
        credential: &Credential,
        image: &[u8],
    ) -> Result<Option<Vec<Point>>, VisionError> {
        self.annotate(credential, image)
            .await?
            .first_face_landmarks()
            .map_err(|status| VisionError::Image {
                code: status.code,
                message: status.message,
            })
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, VisionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
