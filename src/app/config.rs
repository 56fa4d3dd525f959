use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

pub const CONFIG_PATH_ENV: &str = "SCRCPY_PANEL_CONFIG_PATH";
const CONFIG_FILE_NAME: &str = ".scrcpy_panel_config.json";
const CONFIG_FILE_STEM: &str = ".scrcpy_panel_config";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ToolSettings {
    /// Where the release archive is unpacked; empty means the per-user data dir.
    pub scrcpy_dir: String,
    pub scrcpy_path: String,
    pub adb_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    pub default_tcpip_port: u16,
    pub auto_select_first: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            default_tcpip_port: 5555,
            auto_select_first: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandSettings {
    pub command_timeout_secs: u64,
    pub listing_timeout_secs: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: 10,
            listing_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MirrorSettings {
    pub launch_grace_ms: u64,
    pub virtual_display_spec: String,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            launch_grace_ms: 500,
            virtual_display_spec: "1920x1080/440".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootstrapSettings {
    pub version: String,
    /// `{version}` is substituted with [`BootstrapSettings::version`].
    pub url_template: String,
    pub max_redirects: u32,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            version: "v3.1".to_string(),
            url_template:
                "https://github.com/Genymobile/scrcpy/releases/download/{version}/scrcpy-win64-{version}.zip"
                    .to_string(),
            max_redirects: 5,
        }
    }
}

impl BootstrapSettings {
    pub fn download_url(&self) -> String {
        self.url_template.replace("{version}", self.version.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub command: CommandSettings,
    #[serde(default)]
    pub mirror: MirrorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

impl AppConfig {
    pub fn scrcpy_dir(&self) -> PathBuf {
        let configured = self.tools.scrcpy_dir.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("scrcpy_panel").join("scrcpy"))
            .unwrap_or_else(|| PathBuf::from("scrcpy"))
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    home_dir().join(CONFIG_FILE_NAME)
}

/// Sits next to the primary file: `<stem>.backup.json`.
pub fn backup_config_path() -> PathBuf {
    let primary = config_path();
    let stem = primary
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_STEM.to_string());
    primary.with_file_name(format!("{stem}.backup.json"))
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), &backup_config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.device.default_tcpip_port == 0 {
        config.device.default_tcpip_port = 5555;
    }
    if config.command.command_timeout_secs == 0 {
        config.command.command_timeout_secs = 10;
    }
    if config.command.listing_timeout_secs == 0 {
        config.command.listing_timeout_secs = 30;
    }
    if config.mirror.launch_grace_ms > 10_000 {
        config.mirror.launch_grace_ms = 500;
    }
    if config.mirror.virtual_display_spec.trim().is_empty() {
        config.mirror.virtual_display_spec = MirrorSettings::default().virtual_display_spec;
    }
    if config.bootstrap.max_redirects > 20 {
        config.bootstrap.max_redirects = 5;
    }
    if !config.bootstrap.url_template.starts_with("https://") {
        config.bootstrap.url_template = BootstrapSettings::default().url_template;
    }
    config
}
