//! Terminal display sink.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use lookout_core::display::{DisplaySink, RenderedBatchItem};
use lookout_core::reference::ResourceRef;
use lookout_core::result::AnnotatedFrame;

/// Prints results to stdout and errors to stderr.
///
/// References are printed as absolute URLs against the service root.
/// Annotated frames are decoded and, when a frame file is configured,
/// written over it so the file always holds the latest frame.
pub struct ConsoleDisplay {
    base_url: String,
    frame_file: Option<PathBuf>,
    frames: AtomicU64,
}

impl ConsoleDisplay {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            frame_file: None,
            frames: AtomicU64::new(0),
        }
    }

    pub fn with_frame_file(mut self, path: PathBuf) -> Self {
        self.frame_file = Some(path);
        self
    }

    /// Annotated frames received so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    fn print(&self, line: String) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            tracing::debug!(error = %e, "stdout closed");
        }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn show_image(&self, image: ResourceRef) {
        self.print(format!("image: {}", image.resolve(&self.base_url)));
    }

    fn show_video(&self, video: ResourceRef) {
        self.print(format!("video: {}", video.resolve(&self.base_url)));
    }

    fn replace_batch(&self, items: Vec<RenderedBatchItem>) {
        self.print(format!("batch: {} item(s)", items.len()));
        for item in items {
            self.print(format!(
                "  {}: {} ({})",
                item.filename,
                item.labels,
                item.image.resolve(&self.base_url)
            ));
        }
    }

    fn show_frame(&self, frame: AnnotatedFrame) {
        let count = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let Some(path) = &self.frame_file else {
            return;
        };

        let decoded = match frame.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(frame = count, error = %e, "Annotated frame is not a data URL");
                return;
            }
        };
        if let Err(e) = fs::write(path, &decoded.bytes) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write frame");
            return;
        }
        tracing::debug!(
            frame = count,
            mime_type = %decoded.mime_type,
            bytes = decoded.bytes.len(),
            "Frame written",
        );
    }

    fn notify_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}
