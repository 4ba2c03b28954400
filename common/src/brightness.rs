use crate::frame::{BYTES_PER_PIXEL, PixelBuffer};

/// The coefficients below are derived from Rec. ITU-R BT.601-7.
/// They represent how much each channel contributes to the human
/// eye's perception of brightness, and sum to one so that white
/// maps to exactly 1.0.
pub const R_LUMINANCE: f32 = 0.299;
pub const G_LUMINANCE: f32 = 0.587;
pub const B_LUMINANCE: f32 = 0.114;

/// Readings below this are shown as low light
pub const LOW_LIGHT_THRESHOLD: f32 = 0.25;

/// Normalized luma of one pixel, in [0, 1]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    (R_LUMINANCE * r as f32 + G_LUMINANCE * g as f32 + B_LUMINANCE * b as f32) / 255.0
}

/// Mean normalized luma over every pixel of `frame`. Alpha is ignored.
pub fn brightness(frame: &PixelBuffer) -> f32 {
    let pixels = frame.buffer().chunks_exact(BYTES_PER_PIXEL);
    let count = pixels.len();
    if count == 0 {
        return 0.0;
    }

    // accumulate in f64, a 4k frame is ~8M additions
    let sum: f64 = pixels.map(|px| luma(px[0], px[1], px[2]) as f64).sum();
    ((sum / count as f64) as f32).clamp(0.0, 1.0)
}

/// How a brightness reading is presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightLevel {
    LowLight,
    Ok,
}

impl LightLevel {
    pub fn classify(brightness: f32) -> Self {
        Self::classify_with(brightness, LOW_LIGHT_THRESHOLD)
    }

    pub fn classify_with(brightness: f32, threshold: f32) -> Self {
        if brightness < threshold {
            LightLevel::LowLight
        } else {
            LightLevel::Ok
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LightLevel::LowLight => "Low light",
            LightLevel::Ok => "OK",
        }
    }
}
