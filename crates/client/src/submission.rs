//! Single-item submission flow.
//!
//! [`MediaSubmissionClient`] validates a payload, sends it in exactly one
//! request and, for the single image/video flows, renders the result on a
//! [`DisplaySink`] as a cache-busted reference.

use std::sync::Arc;

use lookout_core::display::DisplaySink;
use lookout_core::error::ValidationError;
use lookout_core::media::{MediaKind, MediaPayload, NamedBlob};
use lookout_core::reference::ResourceRef;
use lookout_core::result::AnnotationResult;

use crate::error::{AnnotationError, TransportError};
use crate::service::AnnotationService;

/// Video size the service accepts by default, in megabytes.
pub const DEFAULT_MAX_VIDEO_MB: u64 = 20;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Client-side limits checked before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionLimits {
    /// Largest video body accepted, or `None` for no limit.
    pub max_video_bytes: Option<u64>,
}

impl SubmissionLimits {
    pub fn from_megabytes(max_video_mb: u64) -> Self {
        Self {
            max_video_bytes: Some(max_video_mb.saturating_mul(BYTES_PER_MB)),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            max_video_bytes: None,
        }
    }

    fn check(&self, payload: &MediaPayload) -> Result<(), ValidationError> {
        let (MediaPayload::SingleVideo(file), Some(max)) = (payload, self.max_video_bytes) else {
            return Ok(());
        };
        let size = file.len() as u64;
        if size > max {
            return Err(ValidationError::VideoTooLarge {
                size_mb: size as f64 / BYTES_PER_MB as f64,
                max_mb: max / BYTES_PER_MB,
            });
        }
        Ok(())
    }
}

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self::from_megabytes(DEFAULT_MAX_VIDEO_MB)
    }
}

/// Packages payloads and performs one request per submission.
#[derive(Clone)]
pub struct MediaSubmissionClient {
    service: Arc<dyn AnnotationService>,
    limits: SubmissionLimits,
}

impl MediaSubmissionClient {
    pub fn new(service: Arc<dyn AnnotationService>) -> Self {
        Self::with_limits(service, SubmissionLimits::default())
    }

    pub fn with_limits(service: Arc<dyn AnnotationService>, limits: SubmissionLimits) -> Self {
        Self { service, limits }
    }

    pub fn service(&self) -> &Arc<dyn AnnotationService> {
        &self.service
    }

    /// Validate and send `payload`.
    ///
    /// Validation failures return before any request is made. Transport
    /// and domain failures are returned as-is; nothing is retried.
    pub async fn submit(&self, payload: MediaPayload) -> Result<AnnotationResult, AnnotationError> {
        payload.validate()?;
        self.limits.check(&payload)?;

        tracing::info!(
            files = payload.file_count(),
            bytes = payload.total_bytes(),
            "Submitting media for annotation",
        );

        let result = self.service.submit(&payload).await;
        if let Err(e) = &result {
            tracing::warn!(kind = e.kind(), error = %e, "Annotation request failed");
        }
        result
    }

    /// Submit one image and show the annotated result.
    pub async fn submit_image(
        &self,
        file: Option<NamedBlob>,
        sink: &dyn DisplaySink,
    ) -> Result<ResourceRef, AnnotationError> {
        let reference = self.submit_single(MediaKind::Image, file).await;
        match reference {
            Ok(reference) => {
                sink.show_image(reference.clone());
                Ok(reference)
            }
            Err(e) => Err(notify(sink, e)),
        }
    }

    /// Submit one video and show the annotated result as playable media.
    pub async fn submit_video(
        &self,
        file: Option<NamedBlob>,
        sink: &dyn DisplaySink,
    ) -> Result<ResourceRef, AnnotationError> {
        let reference = self.submit_single(MediaKind::Video, file).await;
        match reference {
            Ok(reference) => {
                sink.show_video(reference.clone());
                Ok(reference)
            }
            Err(e) => Err(notify(sink, e)),
        }
    }

    async fn submit_single(
        &self,
        kind: MediaKind,
        file: Option<NamedBlob>,
    ) -> Result<ResourceRef, AnnotationError> {
        let file = file.ok_or(ValidationError::NoFileSelected(kind))?;
        let payload = match kind {
            MediaKind::Image => MediaPayload::SingleImage(file),
            MediaKind::Video => MediaPayload::SingleVideo(file),
        };

        match self.submit(payload).await? {
            AnnotationResult::Single(result) => Ok(ResourceRef::cache_busted(result.url)),
            AnnotationResult::Batch(_) => Err(TransportError::Malformed {
                endpoint: "single upload",
                reason: "service answered with a batch result".to_string(),
            }
            .into()),
        }
    }
}

/// Surface an error on the sink and hand it back to the caller.
pub(crate) fn notify(sink: &dyn DisplaySink, error: AnnotationError) -> AnnotationError {
    sink.notify_error(&error.user_message());
    error
}
