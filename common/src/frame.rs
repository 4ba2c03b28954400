use image::RgbaImage;
use thiserror::Error;

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("dimensions must be greater than zero")]
    ZeroDimensions,
    #[error("not enough data: expected {expected} bytes but got {actual}")]
    ShortBuffer { expected: usize, actual: usize },
}

/// RGBA pixel surface, used both for decoded camera frames and for the
/// square crops handed to the sample handler
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    /// width of image
    pub w: usize,
    /// height of image
    pub h: usize,
    /// row-major RGBA data, `w * h * 4` bytes
    buffer: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent black buffer
    pub fn new(w: usize, h: usize) -> Result<Self, FrameError> {
        if w == 0 || h == 0 {
            return Err(FrameError::ZeroDimensions);
        }

        Ok(Self {
            w,
            h,
            buffer: vec![0; w * h * BYTES_PER_PIXEL],
        })
    }

    /// Buffer where every pixel has the same RGBA value
    pub fn filled(w: usize, h: usize, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let mut frame = Self::new(w, h)?;
        for px in frame.buffer.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
        Ok(frame)
    }

    pub fn from_rgba(w: usize, h: usize, buffer: Vec<u8>) -> Result<Self, FrameError> {
        if w == 0 || h == 0 {
            return Err(FrameError::ZeroDimensions);
        }

        let expected = w * h * BYTES_PER_PIXEL;
        if buffer.len() < expected {
            return Err(FrameError::ShortBuffer {
                expected,
                actual: buffer.len(),
            });
        }

        let mut buffer = buffer;
        buffer.truncate(expected);

        Ok(Self { w, h, buffer })
    }

    /// Expand packed RGB (what the camera backends hand out) into RGBA
    /// with an opaque alpha channel
    pub fn from_rgb(w: usize, h: usize, rgb: &[u8]) -> Result<Self, FrameError> {
        if w == 0 || h == 0 {
            return Err(FrameError::ZeroDimensions);
        }

        let expected = w * h * 3;
        if rgb.len() < expected {
            return Err(FrameError::ShortBuffer {
                expected,
                actual: rgb.len(),
            });
        }

        let mut buffer = Vec::with_capacity(w * h * BYTES_PER_PIXEL);
        for px in rgb[..expected].chunks_exact(3) {
            buffer.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }

        Ok(Self { w, h, buffer })
    }

    /// Return raw image data
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Return raw, mutable image data
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Get pixel RGBA values, with bounds checking
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.w || y >= self.h {
            return None;
        }

        let i = (y * self.w + x) * BYTES_PER_PIXEL;
        let px = self.buffer.get(i..i + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) -> bool {
        if x >= self.w || y >= self.h {
            return false;
        }

        let i = (y * self.w + x) * BYTES_PER_PIXEL;
        match self.buffer.get_mut(i..i + BYTES_PER_PIXEL) {
            Some(px) => {
                px.copy_from_slice(&rgba);
                true
            }
            None => false,
        }
    }

    /// Reset every byte to zero (transparent black)
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn to_image(&self) -> RgbaImage {
        // length is checked at construction, so the conversion cannot fail
        RgbaImage::from_raw(self.w as u32, self.h as u32, self.buffer.clone())
            .unwrap_or_else(|| RgbaImage::new(self.w as u32, self.h as u32))
    }

    pub fn from_image(img: RgbaImage) -> Result<Self, FrameError> {
        let (w, h) = img.dimensions();
        Self::from_rgba(w as usize, h as usize, img.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(PixelBuffer::new(0, 4), Err(FrameError::ZeroDimensions));
        assert_eq!(PixelBuffer::from_rgb(4, 0, &[]), Err(FrameError::ZeroDimensions));
    }

    #[test]
    fn rejects_short_buffer() {
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            FrameError::ShortBuffer {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn rgb_is_expanded_with_opaque_alpha() {
        let rgb = [10, 20, 30, 40, 50, 60];
        let frame = PixelBuffer::from_rgb(2, 1, &rgb).unwrap();

        assert_eq!(frame.get_pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(frame.get_pixel(1, 0), Some([40, 50, 60, 255]));
        assert_eq!(frame.get_pixel(2, 0), None);
    }

    #[test]
    fn set_pixel_is_bounds_checked() {
        let mut frame = PixelBuffer::new(3, 3).unwrap();
        assert!(frame.set_pixel(2, 2, [1, 2, 3, 4]));
        assert!(!frame.set_pixel(3, 0, [1, 2, 3, 4]));
        assert_eq!(frame.get_pixel(2, 2), Some([1, 2, 3, 4]));

        frame.clear();
        assert_eq!(frame.get_pixel(2, 2), Some([0, 0, 0, 0]));
    }
}
