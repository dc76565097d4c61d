//! Live camera capture for the annotation service.
//!
//! [`StreamCaptureSession`] samples a [`CameraDevice`] on a fixed cadence
//! and forwards frames to an [`AnnotationService`](lookout_client::AnnotationService),
//! keeping at most one frame request in flight.

pub mod camera;
pub mod error;
pub mod session;

pub use camera::{device_from_spec, CameraDevice, CameraHandle, ReplayCamera, SyntheticCamera};
pub use error::DeviceError;
pub use session::{CaptureConfig, CaptureStats, StartOutcome, StreamCaptureSession};
