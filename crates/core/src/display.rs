//! Display sink abstraction.
//!
//! Components push results and error notifications into a [`DisplaySink`]
//! and never read them back. [`MemoryDisplay`] keeps the latest state in
//! memory and is what headless callers and tests render into.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::reference::ResourceRef;
use crate::result::AnnotatedFrame;

/// Shown in place of a label list when the service detected nothing.
pub const NO_LABELS: &str = "no labels";

/// One rendered entry of a batch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBatchItem {
    pub filename: String,
    pub image: ResourceRef,
    /// Labels joined for display, or [`NO_LABELS`].
    pub labels: String,
}

/// Join labels into a display string with an explicit empty state.
pub fn label_text(labels: &[String]) -> String {
    if labels.is_empty() {
        NO_LABELS.to_string()
    } else {
        labels.join(", ")
    }
}

/// Where annotation results end up.
///
/// Every method overwrites the previous value of its slot.
/// [`replace_batch`](DisplaySink::replace_batch) replaces the whole batch
/// list; it never appends.
pub trait DisplaySink: Send + Sync {
    fn show_image(&self, image: ResourceRef);

    fn show_video(&self, video: ResourceRef);

    fn replace_batch(&self, items: Vec<RenderedBatchItem>);

    fn show_frame(&self, frame: AnnotatedFrame);

    /// Tell the user something went wrong.
    fn notify_error(&self, message: &str);
}

/// Snapshot of what a [`MemoryDisplay`] currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub image: Option<ResourceRef>,
    pub video: Option<ResourceRef>,
    pub batch: Vec<RenderedBatchItem>,
    pub frame: Option<AnnotatedFrame>,
    /// Number of frames pushed since creation.
    pub frames_shown: usize,
    pub errors: Vec<String>,
}

/// In-memory [`DisplaySink`].
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    state: Mutex<DisplayState>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the current display state.
    pub fn snapshot(&self) -> DisplayState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplaySink for MemoryDisplay {
    fn show_image(&self, image: ResourceRef) {
        self.lock().image = Some(image);
    }

    fn show_video(&self, video: ResourceRef) {
        self.lock().video = Some(video);
    }

    fn replace_batch(&self, items: Vec<RenderedBatchItem>) {
        self.lock().batch = items;
    }

    fn show_frame(&self, frame: AnnotatedFrame) {
        let mut state = self.lock();
        state.frame = Some(frame);
        state.frames_shown += 1;
    }

    fn notify_error(&self, message: &str) {
        self.lock().errors.push(message.to_string());
    }
}
