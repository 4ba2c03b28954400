use common::FrameError;
use thiserror::Error;

/// Failures while acquiring or using a camera stream.
///
/// The `Display` text is the one-line message shown to the user.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no matching camera: {0}")]
    NotFound(String),
    #[error("camera capture not supported: {0}")]
    NotSupported(String),
    #[error("camera backend error: {0}")]
    Backend(String),
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Short error name, the way the status line labels failures
    pub fn name(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied(_) => "PermissionDenied",
            CaptureError::NotFound(_) => "NotFound",
            CaptureError::NotSupported(_) => "NotSupported",
            CaptureError::Backend(_) => "BackendError",
            CaptureError::Frame(_) => "FrameError",
            CaptureError::Encode(_) => "EncodeError",
            CaptureError::Io(_) => "IoError",
        }
    }

    /// Sort a backend's error text into the taxonomy above. Native camera
    /// backends only hand out strings, so this goes by wording.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
            CaptureError::PermissionDenied(message)
        } else if lower.contains("not found")
            || lower.contains("no such")
            || lower.contains("no device")
            || lower.contains("could not open device")
            || lower.contains("invalid index")
        {
            CaptureError::NotFound(message)
        } else if lower.contains("unsupported") || lower.contains("not implemented") {
            CaptureError::NotSupported(message)
        } else {
            CaptureError::Backend(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_backend_wording() {
        assert!(matches!(
            CaptureError::classify("Access denied by user"),
            CaptureError::PermissionDenied(_)
        ));
        assert!(matches!(
            CaptureError::classify("Could not open device cam-9: No such file"),
            CaptureError::NotFound(_)
        ));
        assert!(matches!(
            CaptureError::classify("This operation is not implemented yet"),
            CaptureError::NotSupported(_)
        ));
        assert!(matches!(
            CaptureError::classify("stream hiccup"),
            CaptureError::Backend(_)
        ));
    }

    #[test]
    fn display_keeps_underlying_message() {
        let err = CaptureError::NotFound("cam-A".into());
        assert_eq!(err.name(), "NotFound");
        assert_eq!(err.to_string(), "no matching camera: cam-A");
    }
}
