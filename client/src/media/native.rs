use crate::error::CaptureError;
use crate::lock;
use crate::media::{Constraints, DeviceInfo, MediaDevices, MediaStream};
use common::PixelBuffer;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Camera, native_api_backend, query};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Frame rate asked for alongside the ideal resolution
const IDEAL_FRAME_RATE: u32 = 30;
/// Pause after a failed frame read before asking again
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Does this platform have a native camera backend at all?
pub fn is_supported() -> bool {
    native_api_backend().is_some()
}

/// Cameras reached through the operating system's native capture API
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDevices;

impl NativeDevices {
    pub fn new() -> Self {
        Self
    }
}

impl MediaDevices for NativeDevices {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let cameras = query(ApiBackend::Auto).map_err(|e| CaptureError::classify(e.to_string()))?;

        Ok(cameras
            .iter()
            .enumerate()
            .map(|(i, cam)| DeviceInfo::new(cam.index().as_string(), &cam.human_name(), i))
            .collect())
    }

    fn open(&self, constraints: &Constraints) -> Result<Box<dyn MediaStream>, CaptureError> {
        if let Constraints::Exact { device_id } = constraints {
            // an unknown id is a NotFound, not whatever the backend says about it
            if let Ok(devices) = self.enumerate() {
                if !devices.iter().any(|d| &d.id == device_id) {
                    return Err(CaptureError::NotFound(device_id.clone()));
                }
            }
        }

        Ok(Box::new(NativeStream::open(constraints.clone())?))
    }
}

/// Parse an id produced by `enumerate` back into a backend index
fn camera_index(device_id: &str) -> CameraIndex {
    match device_id.parse::<u32>() {
        Ok(i) => CameraIndex::Index(i),
        Err(_) => CameraIndex::String(device_id.to_string()),
    }
}

fn requested_format(constraints: &Constraints) -> (CameraIndex, RequestedFormat<'static>) {
    match constraints {
        Constraints::Exact { device_id } => (
            camera_index(device_id),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        ),
        Constraints::Ideal {
            facing,
            width,
            height,
        } => {
            debug!(?facing, "facing preference ignored, using the first camera");
            let format = CameraFormat::new(
                Resolution::new(*width, *height),
                FrameFormat::MJPEG,
                IDEAL_FRAME_RATE,
            );
            (
                CameraIndex::Index(0),
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format)),
            )
        }
    }
}

/// A camera stream whose device lives on a dedicated capture thread.
///
/// The camera object is created, read and closed on that one thread; the
/// rest of the program only sees the latest decoded frame.
pub struct NativeStream {
    /// stops the capture thread when set
    stop_flag: Arc<AtomicBool>,
    /// latest decoded frame, shared with the capture thread
    latest: Arc<Mutex<Option<Arc<PixelBuffer>>>>,
    /// capture thread, `None` once joined
    handle: Option<thread::JoinHandle<()>>,
}

impl NativeStream {
    /// Start the capture thread and wait until it has opened the camera
    /// (or failed to)
    pub fn open(constraints: Constraints) -> Result<Self, CaptureError> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(Mutex::new(None));
        let (init_tx, init_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);

        let handle = {
            let stop_flag = Arc::clone(&stop_flag);
            let latest = Arc::clone(&latest);

            thread::Builder::new()
                .name("lumacam-capture".into())
                .spawn(move || capture_thread(constraints, stop_flag, latest, init_tx))?
        };

        match init_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_flag,
                latest,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Backend(
                    "capture thread exited before opening the camera".into(),
                ))
            }
        }
    }
}

impl MediaStream for NativeStream {
    fn latest_frame(&self) -> Option<Arc<PixelBuffer>> {
        lock(&self.latest).clone()
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        // release the camera even if nobody called stop
        self.stop();
    }
}

fn capture_thread(
    constraints: Constraints,
    stop_flag: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Arc<PixelBuffer>>>>,
    init_tx: mpsc::SyncSender<Result<(), CaptureError>>,
) {
    let (index, format) = requested_format(&constraints);

    let mut camera = match Camera::new(index, format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = init_tx.send(Err(CaptureError::classify(e.to_string())));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = init_tx.send(Err(CaptureError::classify(e.to_string())));
        return;
    }

    let resolution = camera.resolution();
    info!(
        camera = %camera.info().human_name(),
        width = resolution.width(),
        height = resolution.height(),
        "camera stream opened"
    );

    if init_tx.send(Ok(())).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    while !stop_flag.load(Ordering::Acquire) {
        // blocks until the camera delivers the next frame
        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to read camera frame");
                thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        };

        let rgb = match frame.decode_image::<RgbFormat>() {
            Ok(rgb) => rgb,
            Err(e) => {
                warn!(error = %e, "failed to decode camera frame");
                continue;
            }
        };

        let (w, h) = (rgb.width() as usize, rgb.height() as usize);
        match PixelBuffer::from_rgb(w, h, rgb.as_raw()) {
            Ok(decoded) => *lock(&latest) = Some(Arc::new(decoded)),
            Err(e) => warn!(error = %e, "camera delivered an unusable frame"),
        }
    }

    if let Err(e) = camera.stop_stream() {
        warn!(error = %e, "failed to stop camera stream");
    }
    info!("camera stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_map_to_indices() {
        assert_eq!(camera_index("2"), CameraIndex::Index(2));
        assert_eq!(
            camera_index("/dev/video4"),
            CameraIndex::String("/dev/video4".into())
        );
    }

    #[test]
    fn ideal_request_opens_first_camera() {
        let (index, _) = requested_format(&Constraints::for_device(None, 1280, 720));
        assert_eq!(index, CameraIndex::Index(0));
    }
}
