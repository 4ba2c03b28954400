use crate::frame::{FrameError, PixelBuffer};
use image::imageops::{self, FilterType};

/// Side of the square surface handed to the sample handler
pub const SAMPLE_SIZE: usize = 256;
/// Side of the square still written by a snapshot
pub const SNAPSHOT_SIZE: usize = 512;

/// Largest square sub-region centered in a `w x h` frame.
///
/// Origins keep their fractional half when `w - h` is odd; `pixel_origin`
/// floors them for pixel addressing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub sx: f64,
    pub sy: f64,
    pub side: f64,
}

impl CropRect {
    pub fn centered_square(w: usize, h: usize) -> Result<Self, FrameError> {
        if w == 0 || h == 0 {
            return Err(FrameError::ZeroDimensions);
        }

        let side = w.min(h) as f64;
        Ok(Self {
            sx: (w as f64 - side) / 2.0,
            sy: (h as f64 - side) / 2.0,
            side,
        })
    }

    pub fn pixel_origin(&self) -> (u32, u32) {
        (self.sx.floor() as u32, self.sy.floor() as u32)
    }

    pub fn pixel_side(&self) -> u32 {
        self.side as u32
    }
}

/// Draw the centered square crop of `frame` into a fresh `target x target`
/// buffer. Bilinear filtering when the side changes.
pub fn crop_and_scale(frame: &PixelBuffer, target: usize) -> Result<PixelBuffer, FrameError> {
    if target == 0 {
        return Err(FrameError::ZeroDimensions);
    }

    let rect = CropRect::centered_square(frame.w, frame.h)?;
    let (sx, sy) = rect.pixel_origin();
    let side = rect.pixel_side();

    let img = frame.to_image();
    let square = imageops::crop_imm(&img, sx, sy, side, side).to_image();

    let scaled = if side as usize == target {
        square
    } else {
        imageops::resize(&square, target as u32, target as u32, FilterType::Triangle)
    };

    PixelBuffer::from_image(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_is_centered_for_landscape_and_portrait() {
        for (w, h) in [(1280, 720), (720, 1280), (641, 480), (3, 8), (1, 1), (500, 500)] {
            let rect = CropRect::centered_square(w, h).unwrap();
            let side = w.min(h) as f64;

            assert_eq!(rect.side, side);
            assert_eq!(rect.sx, (w as f64 - side) / 2.0);
            assert_eq!(rect.sy, (h as f64 - side) / 2.0);
        }
    }

    #[test]
    fn odd_difference_keeps_half_pixel() {
        let rect = CropRect::centered_square(641, 480).unwrap();
        assert_eq!(rect.sx, 80.5);
        assert_eq!(rect.pixel_origin(), (80, 0));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(CropRect::centered_square(0, 10).is_err());
    }

    #[test]
    fn crop_takes_center_of_wide_frame() {
        // left third red, middle third green, right third blue
        let mut frame = PixelBuffer::new(300, 100).unwrap();
        for y in 0..100 {
            for x in 0..300 {
                let px = match x {
                    0..=99 => [255, 0, 0, 255],
                    100..=199 => [0, 255, 0, 255],
                    _ => [0, 0, 255, 255],
                };
                frame.set_pixel(x, y, px);
            }
        }

        let crop = crop_and_scale(&frame, 100).unwrap();
        assert_eq!(crop.dimensions(), (100, 100));
        assert_eq!(crop.get_pixel(0, 0), Some([0, 255, 0, 255]));
        assert_eq!(crop.get_pixel(99, 99), Some([0, 255, 0, 255]));
    }

    #[test]
    fn crop_scales_to_sample_size() {
        let frame = PixelBuffer::filled(640, 480, [90, 90, 90, 255]).unwrap();
        let crop = crop_and_scale(&frame, SAMPLE_SIZE).unwrap();

        assert_eq!(crop.dimensions(), (SAMPLE_SIZE, SAMPLE_SIZE));
        assert_eq!(crop.get_pixel(128, 128), Some([90, 90, 90, 255]));
    }
}
