//! Platform independent pieces of lumacam: pixel buffers, crop geometry,
//! the brightness analyzer and the structured status shown to the user.

pub mod brightness;
pub mod crop;
pub mod frame;
pub mod snapshot;
pub mod status;

pub use brightness::{LightLevel, brightness};
pub use crop::{CropRect, crop_and_scale};
pub use frame::{FrameError, PixelBuffer};
pub use status::{Severity, Status};
