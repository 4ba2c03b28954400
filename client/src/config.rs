use crate::sampler::OverlapPolicy;
use common::brightness::LOW_LIGHT_THRESHOLD;
use common::crop::{SAMPLE_SIZE, SNAPSHOT_SIZE};
use common::snapshot::DEFAULT_JPEG_QUALITY;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a capture session and its host need to know, filled from the
/// command line in `main`
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// camera to open, `None` for the default camera at the ideal size
    pub device_id: Option<String>,
    /// minimum time between brightness samples
    pub sample_interval: Duration,
    /// side of the square crop handed to the sample handler
    pub sample_size: usize,
    /// side of the square crop written by a snapshot
    pub snapshot_size: usize,
    /// JPEG quality for snapshots, out of 100
    pub jpeg_quality: u8,
    /// resolution requested when no device is named
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// frame loop rate, stands in for the display refresh
    pub refresh_hz: u32,
    /// what to do with samples taken while the handler is still running
    pub overlap: OverlapPolicy,
    /// readings below this are reported as low light
    pub low_light_threshold: f32,
    /// where snapshots are written
    pub snapshot_dir: PathBuf,
}

impl CaptureConfig {
    pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(400);
    pub const DEFAULT_IDEAL_WIDTH: u32 = 1280;
    pub const DEFAULT_IDEAL_HEIGHT: u32 = 720;
    pub const DEFAULT_REFRESH_HZ: u32 = 60;

    /// Time between two frame loop ticks
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_interval: Self::DEFAULT_SAMPLE_INTERVAL,
            sample_size: SAMPLE_SIZE,
            snapshot_size: SNAPSHOT_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            ideal_width: Self::DEFAULT_IDEAL_WIDTH,
            ideal_height: Self::DEFAULT_IDEAL_HEIGHT,
            refresh_hz: Self::DEFAULT_REFRESH_HZ,
            overlap: OverlapPolicy::default(),
            low_light_threshold: LOW_LIGHT_THRESHOLD,
            snapshot_dir: PathBuf::from("."),
        }
    }
}
