use common::PixelBuffer;
use common::brightness::luma;
use lumacam::overlay::OverlaySurface;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

/// Intensity ramp for the live preview, darkest first
pub const ASCII_INTENSITY: &str = " .:coPO?@■";
/// Cell drawn wherever the guide overlay is painted
pub const GUIDE_CHAR: char = '*';

/// Terminal cells are about twice as tall as they are wide, so the overlay
/// gets two pixel rows per text row to keep the ring round
pub const OVERLAY_ROWS_PER_CELL: usize = 2;

/// Overlay size matching a preview pane of `cols x rows` cells
pub fn overlay_size(cols: u16, rows: u16) -> (usize, usize) {
    (cols as usize, rows as usize * OVERLAY_ROWS_PER_CELL)
}

/// Render the live frame as ASCII art stretched over `cols x rows` cells,
/// with the guide overlay composited on top
pub fn render_preview(
    frame: Option<&PixelBuffer>,
    overlay: &OverlaySurface,
    cols: u16,
    rows: u16,
) -> Vec<Line<'static>> {
    let ramp: Vec<char> = ASCII_INTENSITY.chars().collect();
    let guide_style = Style::default().fg(Color::Cyan);
    let (cols, rows) = (cols as usize, rows as usize);

    let mut lines = Vec::with_capacity(rows);
    for y in 0..rows {
        let mut spans = Vec::new();
        let mut plain = String::new();

        for x in 0..cols {
            let guide = (0..OVERLAY_ROWS_PER_CELL)
                .any(|dy| overlay.is_painted(x, y * OVERLAY_ROWS_PER_CELL + dy));

            if guide {
                if !plain.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut plain)));
                }
                spans.push(Span::styled(GUIDE_CHAR.to_string(), guide_style));
                continue;
            }

            plain.push(match frame {
                Some(frame) => intensity_char(frame, x, y, cols, rows, &ramp),
                None => ' ',
            });
        }

        if !plain.is_empty() {
            spans.push(Span::raw(plain));
        }
        lines.push(Line::from(spans));
    }

    lines
}

/// Map a preview cell to its frame pixel and pick a ramp character by luma
fn intensity_char(
    frame: &PixelBuffer,
    x: usize,
    y: usize,
    cols: usize,
    rows: usize,
    ramp: &[char],
) -> char {
    // scaling factors from the preview's dimensions to the frame's
    let scale_x = frame.w as f32 / cols as f32;
    let scale_y = frame.h as f32 / rows as f32;
    let f_x = ((x as f32 * scale_x) as usize).min(frame.w - 1);
    let f_y = ((y as f32 * scale_y) as usize).min(frame.h - 1);

    match frame.get_pixel(f_x, f_y) {
        Some([r, g, b, _]) => {
            let char_i = (luma(r, g, b) * ramp.len() as f32) as usize;
            // bounds check (e.g. floating point rounding error)
            ramp[char_i.min(ramp.len() - 1)]
        }
        None => ' ',
    }
}
