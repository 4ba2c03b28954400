/// Fraction of the overlay's shorter side used as the guide ring radius
pub const GUIDE_RADIUS_FACTOR: f32 = 0.3;
/// Stroke width of the guide ring, in overlay pixels
pub const GUIDE_STROKE_WIDTH: f32 = 3.0;
/// Cyan at 40% opacity
pub const GUIDE_COLOR: [u8; 4] = [0, 255, 255, 102];

/// Transparent RGBA layer drawn over the live preview.
///
/// The host owns its size: whenever the preview area changes it calls
/// `resize` so the backing pixels match what is displayed. A zero-sized
/// overlay is valid and draws nothing.
#[derive(Debug, Clone, Default)]
pub struct OverlaySurface {
    w: usize,
    h: usize,
    pixels: Vec<u8>,
}

impl OverlaySurface {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            pixels: vec![0; w * h * 4],
        }
    }

    /// Match the backing buffer to the displayed size. Contents are cleared
    /// when the size actually changes.
    pub fn resize(&mut self, w: usize, h: usize) {
        if (w, h) != (self.w, self.h) {
            self.w = w;
            self.h = h;
            self.pixels = vec![0; w * h * 4];
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.w || y >= self.h {
            return None;
        }
        let i = (y * self.w + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Is anything drawn at this pixel?
    pub fn is_painted(&self, x: usize, y: usize) -> bool {
        self.get_pixel(x, y).is_some_and(|px| px[3] > 0)
    }

    fn put(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = (y * self.w + x) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Clear the surface and stroke the guide ring sized to it
    pub fn draw_guide(&mut self) -> GuideRing {
        self.clear();
        let ring = GuideRing::for_surface(self.w, self.h);
        ring.stroke(self);
        ring
    }
}

/// Circle showing where to center the subject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideRing {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub stroke_width: f32,
    pub color: [u8; 4],
}

impl GuideRing {
    pub fn for_surface(w: usize, h: usize) -> Self {
        Self {
            cx: w as f32 / 2.0,
            cy: h as f32 / 2.0,
            radius: w.min(h) as f32 * GUIDE_RADIUS_FACTOR,
            stroke_width: GUIDE_STROKE_WIDTH,
            color: GUIDE_COLOR,
        }
    }

    /// Does the stroke cover the pixel whose top-left corner is (x, y)?
    pub fn covers(&self, x: usize, y: usize) -> bool {
        let dx = x as f32 + 0.5 - self.cx;
        let dy = y as f32 + 0.5 - self.cy;
        let d = (dx * dx + dy * dy).sqrt();
        (d - self.radius).abs() <= self.stroke_width / 2.0
    }

    fn stroke(&self, surface: &mut OverlaySurface) {
        if self.radius <= 0.0 {
            return;
        }

        // only visit the ring's bounding box
        let reach = self.radius + self.stroke_width;
        let x0 = (self.cx - reach).floor().max(0.0) as usize;
        let y0 = (self.cy - reach).floor().max(0.0) as usize;
        let x1 = ((self.cx + reach).ceil() as usize).min(surface.w);
        let y1 = ((self.cy + reach).ceil() as usize).min(surface.h);

        for y in y0..y1 {
            for x in x0..x1 {
                if self.covers(x, y) {
                    surface.put(x, y, self.color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_is_centered_with_radius_from_short_side() {
        let ring = GuideRing::for_surface(200, 100);
        assert_eq!((ring.cx, ring.cy), (100.0, 50.0));
        assert_eq!(ring.radius, 30.0);
        assert_eq!(ring.stroke_width, 3.0);
        assert_eq!(ring.color, [0, 255, 255, 102]);
    }

    #[test]
    fn guide_paints_ring_but_not_center_or_corners() {
        let mut overlay = OverlaySurface::new(200, 100);
        overlay.draw_guide();

        // rightmost point of the ring, radius 30 from (100, 50)
        assert_eq!(overlay.get_pixel(129, 49), Some(GUIDE_COLOR));
        assert!(overlay.is_painted(70, 50));
        assert!(!overlay.is_painted(100, 50));
        assert!(!overlay.is_painted(0, 0));
        assert!(!overlay.is_painted(199, 99));
    }

    #[test]
    fn redraw_clears_previous_ring() {
        let mut overlay = OverlaySurface::new(200, 100);
        overlay.draw_guide();
        assert!(overlay.is_painted(129, 49));

        overlay.resize(100, 100);
        overlay.draw_guide();
        // radius 30 around (50, 50) now
        assert!(overlay.is_painted(79, 49));
        assert!(!overlay.is_painted(20, 90));
    }

    #[test]
    fn zero_sized_overlay_draws_nothing() {
        let mut overlay = OverlaySurface::new(0, 0);
        let ring = overlay.draw_guide();
        assert_eq!(ring.radius, 0.0);
        assert_eq!(overlay.get_pixel(0, 0), None);
    }
}
