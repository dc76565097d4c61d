//! Camera devices and handles.
//!
//! A [`CameraDevice`] describes where frames come from; opening it yields a
//! [`CameraHandle`] that owns the underlying tracks until
//! [`release`](CameraHandle::release) is called.
//!
//! Two devices ship with the crate:
//! - [`ReplayCamera`] replays the still images of a directory in name
//!   order, looping forever.
//! - [`SyntheticCamera`] (`stub://pattern`) renders a moving test pattern.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use lookout_core::media::{is_supported_image, mime_for_filename, Frame};

use crate::error::DeviceError;

/// Device spec that selects the [`SyntheticCamera`].
pub const SYNTHETIC_DEVICE: &str = "stub://pattern";

/// Something a capture session can acquire.
pub trait CameraDevice: Send + Sync {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Acquire the device.
    fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError>;
}

/// An acquired camera.
pub trait CameraHandle: Send {
    /// Sample one still.
    fn capture(&mut self) -> Result<Frame, DeviceError>;

    /// Stop all underlying tracks. Later captures fail with
    /// [`DeviceError::Released`].
    fn release(&mut self);
}

/// Resolve a device spec from configuration.
pub fn device_from_spec(spec: &str) -> Box<dyn CameraDevice> {
    if spec == SYNTHETIC_DEVICE {
        Box::new(SyntheticCamera::default())
    } else {
        Box::new(ReplayCamera::new(spec))
    }
}

// ----------------------------------------------------------------------------
// Replay camera
// ----------------------------------------------------------------------------

/// Replays the images in a directory as a live feed.
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    dir: PathBuf,
    name: String,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir.display().to_string();
        Self { dir, name }
    }
}

impl CameraDevice for ReplayCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| DeviceError::from_io(&self.name, e))?;

        let mut stills: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_supported_image(path))
            .collect();
        stills.sort();

        if stills.is_empty() {
            return Err(DeviceError::NotFound(format!(
                "{}: no images to replay",
                self.name
            )));
        }

        tracing::info!(device = %self.name, stills = stills.len(), "Replay camera opened");
        Ok(Box::new(ReplayHandle {
            stills,
            next: 0,
            released: false,
        }))
    }
}

struct ReplayHandle {
    stills: Vec<PathBuf>,
    next: usize,
    released: bool,
}

impl CameraHandle for ReplayHandle {
    fn capture(&mut self) -> Result<Frame, DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        let path = &self.stills[self.next];
        self.next = (self.next + 1) % self.stills.len();

        let bytes = fs::read(path)
            .map_err(|e| DeviceError::Capture(format!("{}: {e}", path.display())))?;
        Ok(Frame {
            mime_type: mime_for_filename(&file_name(path)),
            bytes,
        })
    }

    fn release(&mut self) {
        self.released = true;
        self.stills.clear();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://pattern)
// ----------------------------------------------------------------------------

/// Generates a diagonal gradient that shifts every frame.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    pub width: u32,
    pub height: u32,
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

impl CameraDevice for SyntheticCamera {
    fn name(&self) -> &str {
        SYNTHETIC_DEVICE
    }

    fn open(&self) -> Result<Box<dyn CameraHandle>, DeviceError> {
        Ok(Box::new(SyntheticHandle {
            width: self.width,
            height: self.height,
            frame_count: 0,
            released: false,
        }))
    }
}

struct SyntheticHandle {
    width: u32,
    height: u32,
    frame_count: u32,
    released: bool,
}

impl CameraHandle for SyntheticHandle {
    fn capture(&mut self) -> Result<Frame, DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        let offset = self.frame_count % 256;
        self.frame_count = self.frame_count.wrapping_add(1);

        let pixels = RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([(x + offset) as u8, (y + offset) as u8, offset as u8])
        });

        let mut bytes = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .map_err(|e| DeviceError::Capture(e.to_string()))?;
        Ok(Frame::jpeg(bytes))
    }

    fn release(&mut self) {
        self.released = true;
    }
}
