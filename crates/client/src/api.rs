//! REST client for the annotation service endpoints.
//!
//! Wraps the upload, webcam and output endpoints using [`reqwest`]. Every
//! call issues exactly one request and never retries; callers decide what
//! to do with a failure.

use std::time::Duration;

use lookout_core::media::{Frame, MediaKind, NamedBlob};
use lookout_core::reference::ResourceRef;
use lookout_core::result::{AnnotatedFrame, BatchResult, SingleResult};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AnnotationError, TransportError};

pub const UPLOAD_IMAGE: &str = "/upload_image";
pub const UPLOAD_VIDEO: &str = "/upload_video";
pub const UPLOAD_DIRECTORY: &str = "/upload_directory";
pub const WEBCAM_FRAME: &str = "/webcam_frame";

/// Multipart field repeated once per file in a directory upload.
const BATCH_FIELD: &str = "images";

/// Connection settings for [`AnnotationApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service root, e.g. `http://127.0.0.1:7860`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7860".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Either body shape the service answers with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceReply<T> {
    Failure { error: String },
    Success(T),
}

/// HTTP client for a single annotation service.
#[derive(Debug, Clone)]
pub struct AnnotationApi {
    client: reqwest::Client,
    base_url: String,
}

impl AnnotationApi {
    /// Build a client with its own connection pool and the configured
    /// timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one image (`POST /upload_image`, field `image`).
    pub async fn upload_image(&self, file: &NamedBlob) -> Result<SingleResult, AnnotationError> {
        self.upload_single(UPLOAD_IMAGE, MediaKind::Image, file).await
    }

    /// Upload one video (`POST /upload_video`, field `video`).
    pub async fn upload_video(&self, file: &NamedBlob) -> Result<SingleResult, AnnotationError> {
        self.upload_single(UPLOAD_VIDEO, MediaKind::Video, file).await
    }

    /// Upload a batch of images in one request (`POST /upload_directory`,
    /// field `images` repeated per file).
    pub async fn upload_directory(
        &self,
        files: &[NamedBlob],
    ) -> Result<BatchResult, AnnotationError> {
        let mut form = Form::new();
        for file in files {
            form = form.part(BATCH_FIELD, file_part(file)?);
        }

        tracing::debug!(files = files.len(), "Uploading image batch");

        let response = self
            .client
            .post(self.endpoint(UPLOAD_DIRECTORY))
            .multipart(form)
            .send()
            .await?;

        read_reply(UPLOAD_DIRECTORY, response).await
    }

    /// Annotate one webcam still (`POST /webcam_frame`, JSON body).
    pub async fn webcam_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError> {
        let body = serde_json::json!({
            "frame": frame.to_data_url(),
        });

        let response = self
            .client
            .post(self.endpoint(WEBCAM_FRAME))
            .json(&body)
            .send()
            .await?;

        read_reply(WEBCAM_FRAME, response).await
    }

    /// Download a derived resource from `/outputs/...`.
    ///
    /// The reference's cache-busting stamp is sent along so intermediaries
    /// never serve a stale copy.
    pub async fn fetch_output(&self, reference: &ResourceRef) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(reference.resolve(&self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn upload_single(
        &self,
        endpoint: &'static str,
        kind: MediaKind,
        file: &NamedBlob,
    ) -> Result<SingleResult, AnnotationError> {
        let form = Form::new().part(kind.field_name(), file_part(file)?);

        tracing::debug!(
            endpoint,
            filename = %file.filename,
            bytes = file.len(),
            "Uploading {kind}",
        );

        let response = self
            .client
            .post(self.endpoint(endpoint))
            .multipart(form)
            .send()
            .await?;

        read_reply(endpoint, response).await
    }
}

fn file_part(file: &NamedBlob) -> Result<Part, TransportError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.filename.clone())
        .mime_str(file.mime_type())?)
}

/// Interpret a response body.
///
/// An `{error}` body is a domain error whatever the status. Otherwise a
/// non-2xx status is a transport error, and a 2xx body that does not parse
/// as `T` is malformed.
async fn read_reply<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, AnnotationError> {
    let status = response.status();
    let body = response.bytes().await?;

    match (status.is_success(), serde_json::from_slice::<ServiceReply<T>>(&body)) {
        (_, Ok(ServiceReply::Failure { error })) => Err(AnnotationError::Domain {
            status: status.as_u16(),
            message: error,
        }),
        (true, Ok(ServiceReply::Success(value))) => Ok(value),
        (true, Err(e)) => Err(TransportError::Malformed {
            endpoint,
            reason: e.to_string(),
        }
        .into()),
        (false, _) => Err(TransportError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        }
        .into()),
    }
}
