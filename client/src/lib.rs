//! Camera preview with a guide ring and periodic brightness sampling.
//!
//! `CaptureController` owns the camera session; each running session has a
//! frame loop that redraws the guide overlay and hands a square crop of the
//! frame to a `SampleHandler` at a throttled rate.

pub mod config;
pub mod error;
pub mod media;
pub mod overlay;
pub mod sampler;
pub mod session;
pub mod throttle;

pub use config::CaptureConfig;
pub use error::CaptureError;
pub use media::{DeviceInfo, MediaDevices, MediaStream, VideoSurface};
pub use sampler::{OverlapPolicy, SampleHandler, SampleOutcome};
pub use session::{CaptureController, SessionState};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock shared capture state. A panic elsewhere while holding the lock does
/// not make frames or the overlay unusable, so poisoning is ignored.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
