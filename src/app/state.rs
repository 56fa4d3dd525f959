use std::sync::Mutex;
use std::time::Duration;

use crate::app::config::AppConfig;
use crate::app::scrcpy::supervisor::ProcessSupervisor;

pub struct AppState {
    pub supervisor: ProcessSupervisor,
    /// Serial picked in the device list; re-resolved on every refresh.
    pub selected_serial: Mutex<Option<String>>,
}

impl AppState {
    pub fn new(launch_grace: Duration) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(launch_grace),
            selected_serial: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Duration::from_millis(config.mirror.launch_grace_ms))
    }

    pub fn selected(&self) -> Option<String> {
        self.selected_serial
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    pub fn set_selected(&self, serial: Option<String>) {
        if let Ok(mut guard) = self.selected_serial.lock() {
            *guard = serial;
        }
    }
}
