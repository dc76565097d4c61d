use std::io;

/// Camera acquisition and capture failures.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The user or OS refused access to the device.
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// No usable device at the requested location.
    #[error("No camera available: {0}")]
    NotFound(String),

    /// The device is open but could not produce a frame.
    #[error("Camera capture failed: {0}")]
    Capture(String),

    #[error("Camera has been released")]
    Released,
}

impl DeviceError {
    /// Classify an I/O error raised while opening `device`.
    pub fn from_io(device: &str, err: io::Error) -> Self {
        let detail = format!("{device}: {err}");
        match err.kind() {
            io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied(detail),
            io::ErrorKind::NotFound => DeviceError::NotFound(detail),
            _ => DeviceError::Capture(detail),
        }
    }
}
