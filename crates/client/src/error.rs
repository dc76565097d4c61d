use lookout_core::error::ValidationError;

/// Failures below the annotation protocol: the request did not produce a
/// usable answer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status without an error body.
    #[error("Annotation service error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Malformed response from {endpoint}: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Request(e) if e.is_timeout())
    }
}

/// Everything a submission can fail with.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// Bad caller input; no request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service understood the request but reported a failure.
    #[error("Annotation failed ({status}): {message}")]
    Domain { status: u16, message: String },
}

impl AnnotationError {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AnnotationError::Validation(_) => "validation",
            AnnotationError::Transport(_) => "transport",
            AnnotationError::Domain { .. } => "domain",
        }
    }

    /// Text suitable for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            AnnotationError::Validation(e) => e.to_string(),
            AnnotationError::Domain { message, .. } => message.clone(),
            AnnotationError::Transport(_) => "Upload failed".to_string(),
        }
    }
}

impl From<reqwest::Error> for AnnotationError {
    fn from(e: reqwest::Error) -> Self {
        AnnotationError::Transport(TransportError::Request(e))
    }
}
