use crate::media::MediaKind;

/// Caller-side input problems detected before any network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select {} to upload", .0.article())]
    NoFileSelected(MediaKind),

    #[error("File {filename} is empty")]
    EmptyFile { filename: String },

    #[error("Please select at least one image")]
    EmptyBatch,

    #[error("Video too large ({size_mb:.2} MB). Max is {max_mb} MB.")]
    VideoTooLarge { size_mb: f64, max_mb: u64 },
}

/// Errors from encoding or decoding `data:` URLs.
#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("Not a data URL")]
    MissingScheme,

    #[error("Data URL has no payload separator")]
    MissingPayload,

    #[error("Only base64 data URLs are supported")]
    NotBase64,

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}
