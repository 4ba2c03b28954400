//! The platform's camera capability: enumerating video inputs and opening
//! a live stream from one of them.
//!
//! `native` implements this over the operating system's camera APIs; tests
//! supply their own implementation.

pub mod native;

use crate::error::CaptureError;
use crate::lock;
use common::PixelBuffer;
use std::sync::{Arc, Mutex};

/// One video input the platform reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// identifier accepted by `Constraints::Exact`
    pub id: String,
    /// human readable name, never empty
    pub label: String,
}

impl DeviceInfo {
    /// Backends may report a blank name (e.g. before access is granted);
    /// those are shown as "Camera N", counted from one
    pub fn new(id: impl Into<String>, label: &str, position: usize) -> Self {
        let label = label.trim();
        Self {
            id: id.into(),
            label: if label.is_empty() {
                format!("Camera {}", position + 1)
            } else {
                label.to_string()
            },
        }
    }
}

/// Which way a camera faces. Desktop backends cannot tell, so this is only
/// a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    User,
    Environment,
}

/// What to ask the platform for when opening a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraints {
    /// this camera and no other
    Exact { device_id: String },
    /// any camera, preferably facing this way at roughly this size
    Ideal { facing: Facing, width: u32, height: u32 },
}

impl Constraints {
    pub fn for_device(device_id: Option<&str>, ideal_width: u32, ideal_height: u32) -> Self {
        match device_id {
            Some(id) if !id.is_empty() => Constraints::Exact {
                device_id: id.to_string(),
            },
            _ => Constraints::Ideal {
                facing: Facing::Environment,
                width: ideal_width,
                height: ideal_height,
            },
        }
    }
}

/// Source of camera streams
pub trait MediaDevices: Send + Sync + 'static {
    /// List the available video inputs
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Open a live stream. May block for as long as the platform takes
    /// (permission prompts, device wake-up), so callers run it off the
    /// async executor.
    fn open(&self, constraints: &Constraints) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// A live camera stream
pub trait MediaStream: Send + 'static {
    /// Most recent decoded frame, `None` until the first one arrives.
    /// Frames are shared, not copied, between readers.
    fn latest_frame(&self) -> Option<Arc<PixelBuffer>>;

    /// Stop every track and release the device. Safe to call repeatedly.
    fn stop(&mut self);

    /// `false` once `stop` has run
    fn is_live(&self) -> bool;
}

/// The live video surface: a stream shared between the frame loop, which
/// reads its frames, and the controller, which stops it
#[derive(Clone)]
pub struct VideoSurface {
    stream: Arc<Mutex<Box<dyn MediaStream>>>,
}

impl VideoSurface {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream: Arc::new(Mutex::new(stream)),
        }
    }

    pub fn latest_frame(&self) -> Option<Arc<PixelBuffer>> {
        lock(&self.stream).latest_frame()
    }

    pub fn stop(&self) {
        lock(&self.stream).stop();
    }

    pub fn is_live(&self) -> bool {
        lock(&self.stream).is_live()
    }
}
