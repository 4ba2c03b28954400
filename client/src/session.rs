use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::lock;
use crate::media::{Constraints, DeviceInfo, MediaDevices, VideoSurface};
use crate::overlay::OverlaySurface;
use crate::sampler::{LoopStats, SampleHandler, SampleLoop, run_frame_loop};
use common::snapshot::{encode_jpeg, timestamped_file_name};
use common::{PixelBuffer, crop_and_scale};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of the controller's capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
}

/// One start-to-stop lifetime of a camera stream and its frame loop
struct ActiveSession {
    device_id: Option<String>,
    video: VideoSurface,
    cancel: CancellationToken,
    frame_loop: JoinHandle<LoopStats>,
}

/// Owns the (at most one) capture session.
///
/// `start`, `stop` and `switch_device` take `&mut self`, so one transition
/// always finishes, including teardown of the previous session, before the
/// next can begin.
pub struct CaptureController<D: MediaDevices> {
    devices: Arc<D>,
    config: CaptureConfig,
    state: SessionState,
    session: Option<ActiveSession>,
    /// guide layer, sized by the host and drawn by the frame loop
    overlay: Arc<Mutex<OverlaySurface>>,
}

impl<D: MediaDevices> CaptureController<D> {
    pub fn new(devices: D, config: CaptureConfig) -> Self {
        Self {
            devices: Arc::new(devices),
            config,
            state: SessionState::Idle,
            session: None,
            overlay: Arc::new(Mutex::new(OverlaySurface::default())),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Device the running session was started with, `None` for the default
    pub fn current_device(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.device_id.as_deref())
    }

    pub fn overlay(&self) -> Arc<Mutex<OverlaySurface>> {
        Arc::clone(&self.overlay)
    }

    /// Resize handler: keep the overlay's pixels matching its displayed size
    pub fn resize_overlay(&self, w: usize, h: usize) {
        lock(&self.overlay).resize(w, h);
    }

    pub fn video(&self) -> Option<&VideoSurface> {
        self.session.as_ref().map(|s| &s.video)
    }

    pub fn latest_frame(&self) -> Option<Arc<PixelBuffer>> {
        self.video().and_then(VideoSurface::latest_frame)
    }

    /// Available video inputs. Enumeration failures (common before the user
    /// has granted camera access) give an empty list.
    pub async fn list_devices(&self) -> Vec<DeviceInfo> {
        self.refresh_devices().await.unwrap_or_default()
    }

    /// Like `list_devices`, but `None` when enumeration failed, so a host
    /// can keep the list it already shows
    pub async fn refresh_devices(&self) -> Option<Vec<DeviceInfo>> {
        let devices = Arc::clone(&self.devices);
        match tokio::task::spawn_blocking(move || devices.enumerate()).await {
            Ok(Ok(list)) => Some(list),
            Ok(Err(e)) => {
                debug!(error = %e, "device enumeration failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "device enumeration task failed");
                None
            }
        }
    }

    /// Tear down any running session, open a stream from `device_id` (or
    /// the default camera) and start the frame loop, sampling at most once
    /// per `sample_interval`.
    ///
    /// On failure the controller is left `Idle` and the error is returned
    /// for the host to show.
    pub async fn start(
        &mut self,
        device_id: Option<&str>,
        handler: Arc<dyn SampleHandler>,
        sample_interval: Duration,
    ) -> Result<(), CaptureError> {
        self.stop().await;
        self.state = SessionState::Starting;

        let constraints = Constraints::for_device(
            device_id,
            self.config.ideal_width,
            self.config.ideal_height,
        );
        info!(?constraints, "starting camera");

        let devices = Arc::clone(&self.devices);
        let stream = match tokio::task::spawn_blocking(move || devices.open(&constraints)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.state = SessionState::Idle;
                warn!(error = %e, kind = e.name(), "failed to start camera");
                return Err(e);
            }
            Err(e) => {
                self.state = SessionState::Idle;
                return Err(CaptureError::Backend(format!("camera open task failed: {}", e)));
            }
        };

        let video = VideoSurface::new(stream);
        let cancel = CancellationToken::new();
        let sample_loop = SampleLoop::new(
            handler,
            sample_interval,
            self.config.sample_size,
            self.config.overlap,
        );

        let frame_loop = tokio::spawn(run_frame_loop(
            sample_loop,
            video.clone(),
            Arc::clone(&self.overlay),
            self.config.frame_period(),
            cancel.clone(),
        ));

        self.session = Some(ActiveSession {
            device_id: device_id.filter(|id| !id.is_empty()).map(str::to_string),
            video,
            cancel,
            frame_loop,
        });
        self.state = SessionState::Running;
        info!("camera running");

        Ok(())
    }

    /// Restart on another camera. Equivalent to `start`, which stops the
    /// current session first.
    pub async fn switch_device(
        &mut self,
        device_id: Option<&str>,
        handler: Arc<dyn SampleHandler>,
        sample_interval: Duration,
    ) -> Result<(), CaptureError> {
        info!(device = ?device_id, "switching camera");
        self.start(device_id, handler, sample_interval).await
    }

    /// Cancel the frame loop, wait for it to end and stop every track of the
    /// stream. Does nothing without a session.
    pub async fn stop(&mut self) -> Option<LoopStats> {
        let session = self.session.take()?;
        self.state = SessionState::Idle;

        session.cancel.cancel();
        let stats = match session.frame_loop.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "frame loop ended abnormally");
                None
            }
        };

        // joining a native capture thread blocks
        let video = session.video;
        if let Err(e) = tokio::task::spawn_blocking(move || video.stop()).await {
            warn!(error = %e, "failed to stop camera stream");
        }
        info!(?stats, "camera stopped");
        stats
    }

    /// Write a centered square still of the current frame into the
    /// snapshot directory. `Ok(None)` when there is no frame yet.
    pub fn snapshot(&self) -> Result<Option<PathBuf>, CaptureError> {
        let Some(frame) = self.latest_frame() else {
            return Ok(None);
        };

        let square = crop_and_scale(&frame, self.config.snapshot_size)?;
        let bytes = encode_jpeg(&square, self.config.jpeg_quality)?;

        let path = self.config.snapshot_dir.join(timestamped_file_name());
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "snapshot saved");

        Ok(Some(path))
    }
}

impl<D: MediaDevices> Drop for CaptureController<D> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            session.frame_loop.abort();
            session.video.stop();
        }
    }
}
