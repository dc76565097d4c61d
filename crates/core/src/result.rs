//! Annotation results returned by the service.
//!
//! These are immutable snapshots; the display sink takes ownership and may
//! re-render them at will.

use serde::{Deserialize, Serialize};

use crate::data_url::{self, DecodedDataUrl};
use crate::error::DataUrlError;
use crate::reference::output_path;

/// Body of a successful single image/video upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleResult {
    /// Server path of the annotated media, e.g. `/outputs/processed_image.jpg`.
    pub url: String,
}

/// Labels detected in one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Body of a successful directory upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Directory under `/outputs/` holding the annotated files.
    pub output_dir: String,
    /// Per-file results, in server order.
    #[serde(rename = "results", default)]
    pub items: Vec<BatchItem>,
}

impl BatchResult {
    /// Server path of the annotated copy of `item`, percent-encoded.
    pub fn item_path(&self, item: &BatchItem) -> String {
        let dir = self.output_dir.split('/').filter(|s| !s.is_empty());
        output_path(dir.chain(std::iter::once(item.filename.as_str())))
    }
}

/// Successful outcome of a media submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationResult {
    Single(SingleResult),
    Batch(BatchResult),
}

/// Body of a successful webcam frame annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedFrame {
    /// Annotated still as a `data:` URL.
    pub frame: String,
}

impl AnnotatedFrame {
    pub fn decode(&self) -> Result<DecodedDataUrl, DataUrlError> {
        data_url::decode(&self.frame)
    }
}
