use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::error::AppError;
use crate::app::scrcpy::options::{MirrorOptions, RecordFormat};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    #[default]
    Mirroring,
    VirtualDisplay,
}

impl FromStr for LaunchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mirroring" | "mirror" => Ok(LaunchMode::Mirroring),
            "virtual-display" | "vd" => Ok(LaunchMode::VirtualDisplay),
            other => Err(format!("Unknown launch mode: {other}")),
        }
    }
}

/// Bitrate/fps pairs for virtual-display sessions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PerformancePreset {
    Quality,
    #[default]
    Balance,
    Speed,
    Custom,
}

impl PerformancePreset {
    pub fn bit_rate_and_fps(self) -> Option<(&'static str, u32)> {
        match self {
            PerformancePreset::Quality => Some(("20M", 120)),
            PerformancePreset::Balance => Some(("8M", 60)),
            PerformancePreset::Speed => Some(("4M", 30)),
            PerformancePreset::Custom => None,
        }
    }
}

impl FromStr for PerformancePreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "quality" => Ok(PerformancePreset::Quality),
            "balance" => Ok(PerformancePreset::Balance),
            "speed" => Ok(PerformancePreset::Speed),
            "custom" => Ok(PerformancePreset::Custom),
            other => Err(format!("Unknown performance preset: {other}")),
        }
    }
}

/// The "record" checkbox plus its fields. Nothing reaches the options
/// unless `enabled` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordingRequest {
    pub enabled: bool,
    pub path: Option<String>,
    pub format: Option<RecordFormat>,
    pub time_limit_secs: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchPlan {
    pub mode: LaunchMode,
    pub options: MirrorOptions,
    pub preset: PerformancePreset,
    pub recording: RecordingRequest,
}

/// Applies mode rules and the recording toggle, returning the options to
/// hand to the argument builder.
pub fn prepare_launch(
    plan: LaunchPlan,
    default_virtual_display: &str,
    trace_id: &str,
) -> Result<MirrorOptions, AppError> {
    let LaunchPlan {
        mode,
        mut options,
        preset,
        recording,
    } = plan;

    let has_device = options
        .device
        .serial
        .as_deref()
        .is_some_and(|serial| !serial.trim().is_empty());

    match mode {
        LaunchMode::Mirroring => {
            if !has_device && !options.otg {
                return Err(AppError::validation("Select a device first", trace_id));
            }
        }
        LaunchMode::VirtualDisplay => {
            if !has_device {
                return Err(AppError::validation(
                    "Virtual display needs a selected device",
                    trace_id,
                ));
            }
            options.otg = false;
            let spec_missing = options
                .virtual_display
                .new_display
                .as_deref()
                .map_or(true, |spec| spec.trim().is_empty());
            if spec_missing {
                options.virtual_display.new_display = Some(default_virtual_display.to_string());
            }
            if let Some((bit_rate, fps)) = preset.bit_rate_and_fps() {
                options.video.bit_rate = Some(bit_rate.to_string());
                options.video.max_fps = Some(fps);
            }
            options.audio.disabled = true;
        }
    }

    apply_recording(&mut options, recording);
    Ok(options)
}

fn apply_recording(options: &mut MirrorOptions, recording: RecordingRequest) {
    if !recording.enabled {
        return;
    }
    if let Some(path) = recording.path.filter(|path| !path.trim().is_empty()) {
        options.recording.path = Some(path);
        if recording.format.is_some() {
            options.recording.format = recording.format;
        }
    }
    if recording.time_limit_secs.is_some() {
        options.recording.time_limit_secs = recording.time_limit_secs;
    }
}

/// `scrcpy_<unix-millis>.mp4`
pub fn default_record_file_name(now: DateTime<Utc>) -> String {
    format!("scrcpy_{}.mp4", now.timestamp_millis())
}
