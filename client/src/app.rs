use common::{PixelBuffer, Status, brightness};
use lumacam::{DeviceInfo, SampleHandler, SampleOutcome};
use ratatui::widgets::ListState;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Actions the user can take from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Stop,
    Snapshot,
    NextDevice,
    PreviousDevice,
    RefreshDevices,
    Quit,
    None,
}

/// Host state: what the device list shows and what the status line says
pub struct App {
    pub devices: Vec<DeviceInfo>,
    pub devices_state: ListState,
    pub status: Status,
    /// a start is in progress, start controls are disabled
    pub starting: bool,
    /// device asked for on the command line that is not listed (yet)
    pending_device: Option<String>,
}

impl App {
    pub fn new() -> App {
        App {
            devices: Vec::new(),
            devices_state: ListState::default(),
            status: Status::info("Press s to start the camera."),
            starting: false,
            pending_device: None,
        }
    }

    /// Replace the device list, keeping the selection on the same device
    /// when it is still present
    pub fn set_devices(&mut self, devices: Vec<DeviceInfo>) {
        let selected_id = self.selected_device_id().map(str::to_string);
        self.devices = devices;

        let i = selected_id
            .and_then(|id| self.devices.iter().position(|d| d.id == id))
            .or(if self.devices.is_empty() { None } else { Some(0) });
        self.devices_state.select(i);

        // a requested device takes the selection once it is listed
        if let Some(id) = self.pending_device.take() {
            if !self.select_device(&id) {
                self.pending_device = Some(id);
            }
        }
    }

    /// Apply a device refresh. A failed enumeration (`None`) keeps the list
    /// already shown. Returns whether the list changed.
    pub fn refresh_devices(&mut self, listed: Option<Vec<DeviceInfo>>) -> bool {
        match listed {
            Some(devices) if devices != self.devices => {
                self.set_devices(devices);
                true
            }
            _ => false,
        }
    }

    /// Ask for a specific camera. When it is not listed the request is kept
    /// and used by the next start, so an unknown id fails there instead of
    /// falling back to another camera.
    pub fn request_device(&mut self, id: &str) {
        if self.select_device(id) {
            self.pending_device = None;
        } else {
            self.pending_device = Some(id.to_string());
        }
    }

    /// Camera the next start should open: an unlisted request first, then
    /// the selection. The request is used once.
    pub fn take_start_device(&mut self) -> Option<String> {
        self.pending_device
            .take()
            .or_else(|| self.selected_device_id().map(str::to_string))
    }

    /// Select the device with this id, if listed
    pub fn select_device(&mut self, id: &str) -> bool {
        match self.devices.iter().position(|d| d.id == id) {
            Some(i) => {
                self.devices_state.select(Some(i));
                true
            }
            None => false,
        }
    }

    pub fn selected_device_id(&self) -> Option<&str> {
        self.devices_state
            .selected()
            .and_then(|i| self.devices.get(i))
            .map(|d| d.id.as_str())
    }

    pub fn next_device(&mut self) {
        self.pending_device = None;
        if self.devices.is_empty() {
            return;
        }
        let i = match self.devices_state.selected() {
            Some(i) => if i >= self.devices.len() - 1 { 0 } else { i + 1 },
            None => 0,
        };
        self.devices_state.select(Some(i));
    }

    pub fn previous_device(&mut self) {
        self.pending_device = None;
        if self.devices.is_empty() {
            return;
        }
        let i = match self.devices_state.selected() {
            Some(i) => if i == 0 { self.devices.len() - 1 } else { i - 1 },
            None => 0,
        };
        self.devices_state.select(Some(i));
    }
}

/// Sample handler that measures each crop and reports it as a status line
pub fn status_handler(tx: UnboundedSender<Status>, low_light_threshold: f32) -> Arc<dyn SampleHandler> {
    Arc::new(move |sample: PixelBuffer| {
        let reading = brightness(&sample);
        // the receiver is gone once the host shuts down
        let _ = tx.send(Status::brightness_with_threshold(reading, low_light_threshold));
        SampleOutcome::Done
    })
}

/// Throw away readings still queued from a session that has ended, so they
/// cannot overwrite the status that ended it
pub fn discard_queued(rx: &mut UnboundedReceiver<Status>) -> usize {
    let mut discarded = 0;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Severity;
    use tokio::sync::mpsc;

    fn devices(ids: &[&str]) -> Vec<DeviceInfo> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| DeviceInfo::new(*id, "", i))
            .collect()
    }

    #[test]
    fn selection_wraps_around() {
        let mut app = App::new();
        app.set_devices(devices(&["a", "b", "c"]));
        assert_eq!(app.selected_device_id(), Some("a"));

        app.previous_device();
        assert_eq!(app.selected_device_id(), Some("c"));
        app.next_device();
        assert_eq!(app.selected_device_id(), Some("a"));
    }

    #[test]
    fn refresh_keeps_selected_device() {
        let mut app = App::new();
        app.set_devices(devices(&["a", "b"]));
        app.next_device();

        app.set_devices(devices(&["x", "b"]));
        assert_eq!(app.selected_device_id(), Some("b"));

        assert!(app.select_device("x"));
        assert!(!app.select_device("zzz"));
        assert_eq!(app.selected_device_id(), Some("x"));

        app.set_devices(Vec::new());
        assert_eq!(app.selected_device_id(), None);
        app.next_device();
        assert_eq!(app.selected_device_id(), None);
    }

    #[test]
    fn handler_reports_classified_brightness() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = status_handler(tx, 0.25);

        let dim = PixelBuffer::filled(4, 4, [26, 26, 26, 255]).unwrap();
        assert!(matches!(handler.on_sample(dim), SampleOutcome::Done));

        let status = rx.try_recv().unwrap();
        assert_eq!(status.message, "Brightness ~ 10% Low light");
        assert_eq!(status.severity, Severity::Warning);
    }

    #[test]
    fn unlisted_request_is_used_for_the_next_start() {
        let mut app = App::new();
        app.set_devices(devices(&["0"]));
        app.request_device("cam-Z");

        // the listed camera stays selected, but the start asks for cam-Z
        assert_eq!(app.selected_device_id(), Some("0"));
        assert_eq!(app.take_start_device().as_deref(), Some("cam-Z"));
        assert_eq!(app.take_start_device().as_deref(), Some("0"));
    }

    #[test]
    fn request_without_any_listing_is_kept() {
        let mut app = App::new();
        app.request_device("cam-Z");
        assert_eq!(app.selected_device_id(), None);

        // listed once access is granted: becomes the selection
        app.set_devices(devices(&["0", "cam-Z"]));
        assert_eq!(app.selected_device_id(), Some("cam-Z"));
        assert_eq!(app.take_start_device().as_deref(), Some("cam-Z"));
    }

    #[test]
    fn listed_request_selects_and_moving_drops_request() {
        let mut app = App::new();
        app.set_devices(devices(&["a", "b"]));
        app.request_device("b");
        assert_eq!(app.selected_device_id(), Some("b"));

        app.request_device("zzz");
        app.next_device();
        assert_eq!(app.take_start_device().as_deref(), Some("a"));
    }

    #[test]
    fn failed_refresh_keeps_the_list() {
        let mut app = App::new();
        app.set_devices(devices(&["a", "b"]));
        app.next_device();

        assert!(!app.refresh_devices(None));
        assert_eq!(app.devices.len(), 2);
        assert_eq!(app.selected_device_id(), Some("b"));

        assert!(!app.refresh_devices(Some(devices(&["a", "b"]))));
        assert!(app.refresh_devices(Some(devices(&["b"]))));
        assert_eq!(app.selected_device_id(), Some("b"));

        // a real empty listing still clears
        assert!(app.refresh_devices(Some(Vec::new())));
        assert_eq!(app.selected_device_id(), None);
    }

    #[test]
    fn queued_readings_do_not_outlive_their_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = status_handler(tx, 0.25);
        let bright = PixelBuffer::filled(4, 4, [230, 230, 230, 255]).unwrap();
        handler.on_sample(bright.clone());
        handler.on_sample(bright);

        let mut app = App::new();
        app.status = Status::stopped();
        assert_eq!(discard_queued(&mut rx), 2);
        if let Ok(status) = rx.try_recv() {
            app.status = status;
        }
        assert_eq!(app.status.message, "Stopped.");
    }
}
