//! Media payloads submitted to the annotation service.
//!
//! A [`MediaPayload`] is built once per submission and consumed by the
//! request that carries it. [`Frame`]s are produced by camera handles and
//! live for exactly one capture tick.

use std::fmt;
use std::path::Path;

use crate::data_url;
use crate::error::ValidationError;

/// File extensions accepted for image uploads.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Which flavour of single-item upload a payload represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Multipart field name expected by the upload endpoint.
    pub fn field_name(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub(crate) fn article(self) -> &'static str {
        match self {
            MediaKind::Image => "an image",
            MediaKind::Video => "a video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A named file body, as picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlob {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl NamedBlob {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type guessed from the filename extension.
    pub fn mime_type(&self) -> &'static str {
        mime_for_filename(&self.filename)
    }
}

/// Everything the annotation service accepts as an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    SingleImage(NamedBlob),
    SingleVideo(NamedBlob),
    ImageBatch(Vec<NamedBlob>),
}

impl MediaPayload {
    /// Check the caller-side preconditions: a non-empty file for single
    /// uploads and at least one file for batches.
    ///
    /// Files inside a batch are not checked one by one; the service reports
    /// per-file outcomes and one bad file must not sink the whole batch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            MediaPayload::SingleImage(blob) | MediaPayload::SingleVideo(blob) => {
                ensure_non_empty(blob)
            }
            MediaPayload::ImageBatch(blobs) if blobs.is_empty() => {
                Err(ValidationError::EmptyBatch)
            }
            MediaPayload::ImageBatch(_) => Ok(()),
        }
    }

    /// Number of files carried by the payload.
    pub fn file_count(&self) -> usize {
        match self {
            MediaPayload::SingleImage(_) | MediaPayload::SingleVideo(_) => 1,
            MediaPayload::ImageBatch(blobs) => blobs.len(),
        }
    }

    /// Total body size in bytes across all files.
    pub fn total_bytes(&self) -> usize {
        match self {
            MediaPayload::SingleImage(blob) | MediaPayload::SingleVideo(blob) => blob.len(),
            MediaPayload::ImageBatch(blobs) => blobs.iter().map(NamedBlob::len).sum(),
        }
    }
}

fn ensure_non_empty(blob: &NamedBlob) -> Result<(), ValidationError> {
    if blob.is_empty() {
        return Err(ValidationError::EmptyFile {
            filename: blob.filename.clone(),
        });
    }
    Ok(())
}

/// One encoded still sampled from a camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg",
            bytes,
        }
    }

    /// Encode the frame as a `data:` URL for the webcam endpoint.
    pub fn to_data_url(&self) -> String {
        data_url::encode(self.mime_type, &self.bytes)
    }
}

/// Guess a MIME type from a filename extension.
pub fn mime_for_filename(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Whether the path names a file the image endpoints accept.
pub fn is_supported_image(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(extension_of)
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        let payload = MediaPayload::ImageBatch(Vec::new());
        assert_eq!(payload.validate(), Err(ValidationError::EmptyBatch));
    }

    #[test]
    fn empty_file_inside_batch_is_left_to_the_service() {
        let payload = MediaPayload::ImageBatch(vec![
            NamedBlob::new("a.jpg", vec![1, 2, 3]),
            NamedBlob::new("b.jpg", Vec::new()),
        ]);
        assert_eq!(payload.validate(), Ok(()));
        assert_eq!(payload.file_count(), 2);
    }

    #[test]
    fn empty_single_file_is_rejected() {
        let payload = MediaPayload::SingleVideo(NamedBlob::new("clip.mp4", Vec::new()));
        assert_eq!(
            payload.validate(),
            Err(ValidationError::EmptyFile {
                filename: "clip.mp4".into()
            })
        );
    }

    #[test]
    fn single_image_with_bytes_is_valid() {
        let payload = MediaPayload::SingleImage(NamedBlob::new("cat.png", vec![0x89]));
        assert!(payload.validate().is_ok());
        assert_eq!(payload.file_count(), 1);
        assert_eq!(payload.total_bytes(), 1);
    }

    #[test]
    fn mime_guess_is_case_insensitive() {
        assert_eq!(mime_for_filename("A.JPG"), "image/jpeg");
        assert_eq!(mime_for_filename("clip.MP4"), "video/mp4");
        assert_eq!(mime_for_filename("noext"), "application/octet-stream");
    }

    #[test]
    fn supported_images_follow_extension_list() {
        assert!(is_supported_image(Path::new("dir/a.jpeg")));
        assert!(is_supported_image(Path::new("B.BMP")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("jpg")));
    }

    #[test]
    fn frame_encodes_as_jpeg_data_url() {
        let frame = Frame::jpeg(vec![0xff, 0xd8, 0xff]);
        assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,/9j/");
    }
}
