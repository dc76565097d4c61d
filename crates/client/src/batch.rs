//! Batch upload flow.
//!
//! The whole batch travels in one `ImageBatch` request; per-file outcomes
//! are whatever labels the service reports. Rendering replaces the previous
//! batch on the sink in one call.

use lookout_core::display::{label_text, DisplaySink, RenderedBatchItem};
use lookout_core::error::ValidationError;
use lookout_core::media::{MediaPayload, NamedBlob};
use lookout_core::reference::ResourceRef;
use lookout_core::result::{AnnotationResult, BatchResult};

use crate::error::{AnnotationError, TransportError};
use crate::submission::{notify, MediaSubmissionClient};

/// Drives the batch flow on top of a [`MediaSubmissionClient`].
#[derive(Clone)]
pub struct BatchUploadAggregator {
    client: MediaSubmissionClient,
}

impl BatchUploadAggregator {
    pub fn new(client: MediaSubmissionClient) -> Self {
        Self { client }
    }

    /// Submit `files` as one batch and render the per-file results.
    ///
    /// On any error the sink is notified and the previously rendered batch
    /// stays as it was.
    pub async fn submit_batch(
        &self,
        files: Vec<NamedBlob>,
        sink: &dyn DisplaySink,
    ) -> Result<BatchResult, AnnotationError> {
        match self.upload(files).await {
            Ok(result) => {
                tracing::info!(
                    output_dir = %result.output_dir,
                    items = result.items.len(),
                    "Batch annotated",
                );
                sink.replace_batch(render_items(&result));
                Ok(result)
            }
            Err(e) => Err(notify(sink, e)),
        }
    }

    async fn upload(&self, files: Vec<NamedBlob>) -> Result<BatchResult, AnnotationError> {
        if files.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        match self.client.submit(MediaPayload::ImageBatch(files)).await? {
            AnnotationResult::Batch(result) => Ok(result),
            AnnotationResult::Single(_) => Err(TransportError::Malformed {
                endpoint: "batch upload",
                reason: "service answered with a single result".to_string(),
            }
            .into()),
        }
    }
}

/// Build the display list for a batch, in server order.
pub fn render_items(result: &BatchResult) -> Vec<RenderedBatchItem> {
    result
        .items
        .iter()
        .map(|item| RenderedBatchItem {
            filename: item.filename.clone(),
            image: ResourceRef::cache_busted(result.item_path(item)),
            labels: label_text(&item.labels),
        })
        .collect()
}
