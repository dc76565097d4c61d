//! Cache-busted references to derived media.
//!
//! The service reuses output paths (`/outputs/processed_image.jpg` is
//! overwritten on every upload), so every reference handed to a display
//! sink carries a `t=<stamp>` query parameter. Stamps are wall-clock
//! milliseconds, forced to be strictly increasing within the process so two
//! renders in the same millisecond still differ.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use url::Url;

/// Namespace the service serves derived media from.
pub const OUTPUTS_PREFIX: &str = "/outputs/";

const OUTPUTS_BASE: &str = "http://localhost/outputs/";

/// Server path under [`OUTPUTS_PREFIX`] built from raw segments.
///
/// Each segment is percent-encoded on its own, so a `?`, `#` or `/` inside a
/// filename stays part of that segment.
pub fn output_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let segments: Vec<&str> = segments.into_iter().collect();
    encoded_output_path(&segments)
        .unwrap_or_else(|| format!("{OUTPUTS_PREFIX}{}", segments.join("/")))
}

fn encoded_output_path(segments: &[&str]) -> Option<String> {
    let mut url = Url::parse(OUTPUTS_BASE).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments.iter().copied());
    Some(url.path().to_string())
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Next cache-busting stamp: `max(now_ms, previous + 1)`.
pub fn next_stamp() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut previous = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(previous + 1);
        match LAST_STAMP.compare_exchange_weak(
            previous,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => previous = actual,
        }
    }
}

/// A server path plus the stamp that defeats client-side caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    path: String,
    stamp: u64,
}

impl ResourceRef {
    /// Reference `path` with a fresh stamp.
    pub fn cache_busted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stamp: next_stamp(),
        }
    }

    /// The logical server path, without the stamp.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Absolute URL of the reference against the service root.
    pub fn resolve(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{base}{self}")
        } else {
            format!("{base}/{self}")
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.path.contains('?') { '&' } else { '?' };
        write!(f, "{}{separator}t={}", self.path, self.stamp)
    }
}
