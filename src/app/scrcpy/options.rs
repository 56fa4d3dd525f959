//! Option set handed to [`build_scrcpy_args`](super::args::build_scrcpy_args).
//!
//! Every field is optional. An unset field means "let scrcpy use its own
//! default"; nothing here is validated, callers are expected to pass sane
//! combinations.

use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: VideoCodec = VideoCodec::H264;
pub const DEFAULT_AUDIO_CODEC: AudioCodec = AudioCodec::Opus;
pub const DEFAULT_VIDEO_SOURCE: VideoSource = VideoSource::Display;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MirrorOptions {
    pub device: DeviceTarget,
    pub video: VideoOptions,
    pub audio: AudioOptions,
    pub recording: RecordingOptions,
    pub camera: CameraOptions,
    pub window: WindowOptions,
    pub control: ControlOptions,
    pub behavior: DeviceBehavior,
    pub virtual_display: VirtualDisplayOptions,
    pub otg: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceTarget {
    pub serial: Option<String>,
    pub select_usb: bool,
    pub select_tcpip: bool,
    /// `host[:port]` handed to `--tcpip=`.
    pub tcpip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VideoOptions {
    pub source: Option<VideoSource>,
    pub max_size: Option<u32>,
    /// Free form, e.g. `8M`.
    pub bit_rate: Option<String>,
    pub max_fps: Option<u32>,
    pub codec: Option<VideoCodec>,
    pub encoder: Option<String>,
    pub capture_orientation: Option<String>,
    pub orientation: Option<String>,
    pub crop: Option<CropRect>,
    pub angle: Option<String>,
    pub display_id: Option<u32>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CropRect {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<u32>,
    pub y: Option<u32>,
}

impl CropRect {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            x: None,
            y: None,
        }
    }

    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// `W:H:X:Y`, offsets default to 0. `None` unless both sides are known.
    pub fn to_arg_value(&self) -> Option<String> {
        let (width, height) = (self.width?, self.height?);
        Some(format!(
            "{width}:{height}:{}:{}",
            self.x.unwrap_or(0),
            self.y.unwrap_or(0)
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioOptions {
    pub disabled: bool,
    pub source: Option<AudioSource>,
    pub codec: Option<AudioCodec>,
    pub bit_rate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordingOptions {
    pub path: Option<String>,
    pub format: Option<RecordFormat>,
    pub time_limit_secs: Option<u32>,
    pub no_playback: bool,
    pub no_window: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CameraOptions {
    pub id: Option<String>,
    pub facing: Option<CameraFacing>,
    /// `WxH`
    pub size: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowOptions {
    pub title: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub borderless: bool,
    pub always_on_top: bool,
    pub fullscreen: bool,
    pub disable_screensaver: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControlOptions {
    pub disabled: bool,
    pub keyboard: Option<InputMode>,
    pub mouse: Option<InputMode>,
    pub gamepad: Option<InputMode>,
    pub no_clipboard_autosync: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceBehavior {
    pub turn_screen_off: bool,
    pub stay_awake: bool,
    pub show_touches: bool,
    pub power_off_on_close: bool,
    pub no_power_on: bool,
    pub start_app: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VirtualDisplayOptions {
    /// `Some("")` still enables the feature; scrcpy picks the size itself.
    pub new_display: Option<String>,
    pub buffer_ms: Option<u32>,
    pub no_system_decorations: bool,
    pub no_destroy_content: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource {
    Display,
    Camera,
}

impl VideoSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoSource::Display => "display",
            VideoSource::Camera => "camera",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Av1,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Av1 => "av1",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Opus,
    Aac,
    Flac,
    Raw,
}

impl AudioCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioCodec::Opus => "opus",
            AudioCodec::Aac => "aac",
            AudioCodec::Flac => "flac",
            AudioCodec::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSource {
    Output,
    Playback,
    Mic,
    MicUnprocessed,
    MicCamcorder,
    MicVoiceRecognition,
    MicVoiceCommunication,
    VoiceCall,
    VoiceCallUplink,
    VoiceCallDownlink,
    VoicePerformance,
}

impl AudioSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioSource::Output => "output",
            AudioSource::Playback => "playback",
            AudioSource::Mic => "mic",
            AudioSource::MicUnprocessed => "mic-unprocessed",
            AudioSource::MicCamcorder => "mic-camcorder",
            AudioSource::MicVoiceRecognition => "mic-voice-recognition",
            AudioSource::MicVoiceCommunication => "mic-voice-communication",
            AudioSource::VoiceCall => "voice-call",
            AudioSource::VoiceCallUplink => "voice-call-uplink",
            AudioSource::VoiceCallDownlink => "voice-call-downlink",
            AudioSource::VoicePerformance => "voice-performance",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    Mp4,
    Mkv,
    M4a,
    Mka,
    Opus,
    Aac,
    Flac,
    Wav,
}

impl RecordFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordFormat::Mp4 => "mp4",
            RecordFormat::Mkv => "mkv",
            RecordFormat::M4a => "m4a",
            RecordFormat::Mka => "mka",
            RecordFormat::Opus => "opus",
            RecordFormat::Aac => "aac",
            RecordFormat::Flac => "flac",
            RecordFormat::Wav => "wav",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
    External,
}

impl CameraFacing {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraFacing::Front => "front",
            CameraFacing::Back => "back",
            CameraFacing::External => "external",
        }
    }
}

/// Shared by `--keyboard`, `--mouse` and `--gamepad`; scrcpy rejects the
/// modes a given device kind does not support.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Disabled,
    Sdk,
    Uhid,
    Aoa,
}

impl InputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Disabled => "disabled",
            InputMode::Sdk => "sdk",
            InputMode::Uhid => "uhid",
            InputMode::Aoa => "aoa",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_requires_both_sides() {
        let only_width = CropRect {
            width: Some(100),
            ..CropRect::default()
        };
        assert_eq!(only_width.to_arg_value(), None);
        assert_eq!(
            CropRect::new(100, 200).to_arg_value().as_deref(),
            Some("100:200:0:0")
        );
        assert_eq!(
            CropRect::new(100, 200).at(5, 10).to_arg_value().as_deref(),
            Some("100:200:5:10")
        );
    }

    #[test]
    fn deserializes_partial_json() {
        let value = serde_json::json!({
            "device": { "serial": "emulator-5554" },
            "video": { "codec": "h265", "crop": { "width": 10, "height": 20 } },
            "audio": { "source": "mic-unprocessed" },
            "otg": true
        });
        let options: MirrorOptions = serde_json::from_value(value).expect("options");
        assert_eq!(options.device.serial.as_deref(), Some("emulator-5554"));
        assert_eq!(options.video.codec, Some(VideoCodec::H265));
        assert_eq!(options.audio.source, Some(AudioSource::MicUnprocessed));
        assert!(options.otg);
        assert!(!options.window.fullscreen);
        assert_eq!(options.recording, RecordingOptions::default());
    }
}
