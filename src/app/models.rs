use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Device,
    Unauthorized,
}

impl DeviceStatus {
    /// Transitional states (`offline`, `authorizing`, ...) are not listed.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "device" => Some(DeviceStatus::Device),
            "unauthorized" => Some(DeviceStatus::Unauthorized),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Device => "device",
            DeviceStatus::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Usb,
    Wireless,
}

impl ConnectionKind {
    /// TCP/IP devices are listed as `host:port`.
    pub fn from_serial(serial: &str) -> Self {
        if serial.contains(':') {
            ConnectionKind::Wireless
        } else {
            ConnectionKind::Usb
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Usb => "usb",
            ConnectionKind::Wireless => "wireless",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRecord {
    pub serial: String,
    pub status: DeviceStatus,
    pub model: String,
    pub connection_kind: ConnectionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceList {
    pub devices: Vec<DeviceRecord>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostCommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Outcome of `connect` / `disconnect`; the message is the trimmed bridge
/// output. A refused connect is an error instead, while a failed disconnect
/// comes back with `success: false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeActionResult {
    pub success: bool,
    pub address: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrcpyInfo {
    pub available: bool,
    pub version_output: String,
    pub major_version: i32,
    pub command_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolListing {
    pub kind: String,
    pub serial: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapResult {
    pub url: String,
    pub target_dir: String,
    pub bytes: u64,
    pub extracted_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorStatus {
    pub running: bool,
    pub state: String,
}
