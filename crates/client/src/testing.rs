//! In-process service double for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lookout_core::media::{Frame, MediaPayload};
use lookout_core::result::{AnnotatedFrame, AnnotationResult, SingleResult};

use crate::error::AnnotationError;
use crate::service::AnnotationService;

type Responder =
    Box<dyn Fn(&MediaPayload) -> Result<AnnotationResult, AnnotationError> + Send + Sync>;

/// Records every payload and answers with a scripted response.
pub(crate) struct ScriptedService {
    calls: Mutex<Vec<MediaPayload>>,
    respond: Responder,
}

impl ScriptedService {
    pub(crate) fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&MediaPayload) -> Result<AnnotationResult, AnnotationError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Always answers with the given single-item url.
    pub(crate) fn single(url: &'static str) -> Arc<Self> {
        Self::new(move |_| {
            Ok(AnnotationResult::Single(SingleResult {
                url: url.to_string(),
            }))
        })
    }

    pub(crate) fn calls(&self) -> Vec<MediaPayload> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AnnotationService for ScriptedService {
    async fn submit(&self, payload: &MediaPayload) -> Result<AnnotationResult, AnnotationError> {
        self.calls.lock().unwrap().push(payload.clone());
        (self.respond)(payload)
    }

    async fn annotate_frame(&self, frame: &Frame) -> Result<AnnotatedFrame, AnnotationError> {
        Ok(AnnotatedFrame {
            frame: frame.to_data_url(),
        })
    }
}
