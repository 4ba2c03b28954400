use crate::frame::PixelBuffer;
use chrono::{DateTime, Local, TimeZone};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageResult};

/// JPEG quality used for snapshots (out of 100)
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encode `frame` as a JPEG. JPEG has no alpha channel, so it is dropped.
pub fn encode_jpeg(frame: &PixelBuffer, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(frame.to_image()).into_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;

    Ok(bytes)
}

/// `frame-<unix millis>.jpg`
pub fn snapshot_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("frame-{}.jpg", at.timestamp_millis())
}

/// File name for a snapshot taken right now
pub fn timestamped_file_name() -> String {
    snapshot_file_name(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn jpeg_has_soi_marker_and_decodes_to_same_size() {
        let frame = PixelBuffer::filled(64, 64, [200, 120, 40, 255]).unwrap();
        let bytes = encode_jpeg(&frame, DEFAULT_JPEG_QUALITY).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn file_name_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(snapshot_file_name(&at), "frame-1700000000123.jpg");
    }
}
