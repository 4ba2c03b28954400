use crate::brightness::{LOW_LIGHT_THRESHOLD, LightLevel};
use std::fmt;
use std::path::Path;

/// How prominently a status line should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Ok => write!(f, "OK"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Human readable status for whatever is displaying it (terminal UI,
/// stdout in headless mode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub severity: Severity,
}

impl Status {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    /// "Brightness ~ 42% OK", or "... Low light" as a warning
    pub fn brightness(brightness: f32) -> Self {
        Self::brightness_with_threshold(brightness, LOW_LIGHT_THRESHOLD)
    }

    pub fn brightness_with_threshold(brightness: f32, threshold: f32) -> Self {
        let level = LightLevel::classify_with(brightness, threshold);
        let percent = (brightness * 100.0).round() as i32;
        let severity = match level {
            LightLevel::LowLight => Severity::Warning,
            LightLevel::Ok => Severity::Ok,
        };

        Self::new(
            format!("Brightness ~ {}% {}", percent, level.label()),
            severity,
        )
    }

    pub fn stopped() -> Self {
        Self::info("Stopped.")
    }

    pub fn start_failed(err: impl fmt::Display) -> Self {
        Self::new(format!("Error starting camera: {}", err), Severity::Error)
    }

    pub fn unsupported() -> Self {
        Self::new(
            "Camera capture is not supported on this platform.",
            Severity::Error,
        )
    }

    pub fn snapshot_saved(path: &Path) -> Self {
        Self::info(format!("Saved {}", path.display()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}
