//! The asynchronous request contract shared by every flow.
//!
//! Submission, batch and capture code talk to the annotation service only
//! through [`AnnotationService`], so the HTTP client can be swapped for an
//! in-process double.

use async_trait::async_trait;
use lookout_core::media::{Frame, MediaPayload};
use lookout_core::result::{AnnotatedFrame, AnnotationResult};

use crate::api::AnnotationApi;
use crate::error::AnnotationError;

#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Send one payload in exactly one request.
    async fn submit(&self, payload: &MediaPayload) -> Result<AnnotationResult, AnnotationError>;

    /// Annotate one camera frame.
    async fn annotate_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError>;
}

#[async_trait]
impl AnnotationService for AnnotationApi {
    async fn submit(&self, payload: &MediaPayload) -> Result<AnnotationResult, AnnotationError> {
        match payload {
            MediaPayload::SingleImage(file) => {
                self.upload_image(file).await.map(AnnotationResult::Single)
            }
            MediaPayload::SingleVideo(file) => {
                self.upload_video(file).await.map(AnnotationResult::Single)
            }
            MediaPayload::ImageBatch(files) => {
                self.upload_directory(files).await.map(AnnotationResult::Batch)
            }
        }
    }

    async fn annotate_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError> {
        self.webcam_frame(frame).await
    }
}
