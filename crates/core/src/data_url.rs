//! `data:` URL helpers for webcam frames.
//!
//! The webcam endpoint exchanges stills as `data:<mime>;base64,<payload>`
//! strings in both directions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DataUrlError;

/// A decoded `data:` URL body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encode raw bytes as a base64 `data:` URL.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL into its MIME type and bytes.
pub fn decode(url: &str) -> Result<DecodedDataUrl, DataUrlError> {
    let rest = url.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::NotBase64)?;

    Ok(DecodedDataUrl {
        mime_type: mime_type.to_string(),
        bytes: STANDARD.decode(payload.trim())?,
    })
}
