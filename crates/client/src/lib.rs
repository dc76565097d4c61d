//! Annotation service client library.
//!
//! Provides the HTTP API wrapper, the [`AnnotationService`] request
//! contract, and the single-item and batch submission flows that render
//! their results on a display sink.

pub mod api;
pub mod batch;
pub mod error;
pub mod service;
pub mod submission;

#[cfg(test)]
mod testing;

pub use api::{AnnotationApi, ApiConfig};
pub use batch::BatchUploadAggregator;
pub use error::{AnnotationError, TransportError};
pub use service::AnnotationService;
pub use submission::{MediaSubmissionClient, SubmissionLimits};
