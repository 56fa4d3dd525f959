use crate::app::scrcpy::options::{
    MirrorOptions, DEFAULT_AUDIO_CODEC, DEFAULT_VIDEO_CODEC, DEFAULT_VIDEO_SOURCE,
};

/// Maps an option set to scrcpy command-line tokens.
///
/// Each field contributes zero or one token (or `flag value` pair). Numeric
/// sizes, rates and limits treat `0` as unset because scrcpy reads `0` as its
/// own default; window position and display id are emitted for any value.
/// Codecs and the video source are skipped when equal to scrcpy's default.
pub fn build_scrcpy_args(options: &MirrorOptions) -> Vec<String> {
    let mut args = ArgList::default();

    let device = &options.device;
    args.pair("-s", text(&device.serial));
    args.flag("-d", device.select_usb);
    args.flag("-e", device.select_tcpip);
    args.assign("--tcpip", text(&device.tcpip));

    let video = &options.video;
    args.assign(
        "--video-source",
        video
            .source
            .filter(|source| *source != DEFAULT_VIDEO_SOURCE)
            .map(|source| source.as_str()),
    );
    args.pair("-m", positive(video.max_size));
    args.pair("-b", text(&video.bit_rate));
    args.pair("--max-fps", positive(video.max_fps));
    args.assign(
        "--video-codec",
        video
            .codec
            .filter(|codec| *codec != DEFAULT_VIDEO_CODEC)
            .map(|codec| codec.as_str()),
    );
    args.assign("--video-encoder", text(&video.encoder));
    args.assign("--capture-orientation", text(&video.capture_orientation));
    args.assign("--orientation", text(&video.orientation));
    args.assign("--crop", video.crop.and_then(|crop| crop.to_arg_value()));
    args.assign("--angle", text(&video.angle));
    args.assign("--display-id", video.display_id);
    args.flag("--no-video", video.disabled);

    let audio = &options.audio;
    args.flag("--no-audio", audio.disabled);
    args.assign("--audio-source", audio.source.map(|source| source.as_str()));
    args.assign(
        "--audio-codec",
        audio
            .codec
            .filter(|codec| *codec != DEFAULT_AUDIO_CODEC)
            .map(|codec| codec.as_str()),
    );
    args.assign("--audio-bit-rate", text(&audio.bit_rate));

    let recording = &options.recording;
    args.assign("--record", text(&recording.path));
    args.assign(
        "--record-format",
        recording.format.map(|format| format.as_str()),
    );
    args.assign("--time-limit", positive(recording.time_limit_secs));
    args.flag("--no-playback", recording.no_playback);
    args.flag("--no-window", recording.no_window);

    let camera = &options.camera;
    args.assign("--camera-id", text(&camera.id));
    args.assign("--camera-facing", camera.facing.map(|facing| facing.as_str()));
    args.assign("--camera-size", text(&camera.size));

    let window = &options.window;
    args.assign("--window-title", text(&window.title));
    args.assign("--window-x", window.x);
    args.assign("--window-y", window.y);
    args.assign("--window-width", positive(window.width));
    args.assign("--window-height", positive(window.height));
    args.flag("--window-borderless", window.borderless);
    args.flag("--always-on-top", window.always_on_top);
    args.flag("--fullscreen", window.fullscreen);
    args.flag("--disable-screensaver", window.disable_screensaver);

    let control = &options.control;
    args.flag("--no-control", control.disabled);
    args.assign("--keyboard", control.keyboard.map(|mode| mode.as_str()));
    args.assign("--mouse", control.mouse.map(|mode| mode.as_str()));
    args.assign("--gamepad", control.gamepad.map(|mode| mode.as_str()));
    args.flag("--no-clipboard-autosync", control.no_clipboard_autosync);

    let behavior = &options.behavior;
    args.flag("--turn-screen-off", behavior.turn_screen_off);
    args.flag("--stay-awake", behavior.stay_awake);
    args.flag("--show-touches", behavior.show_touches);
    args.flag("--power-off-on-close", behavior.power_off_on_close);
    args.flag("--no-power-on", behavior.no_power_on);
    args.assign("--start-app", text(&behavior.start_app));

    let virtual_display = &options.virtual_display;
    // An empty spec is still emitted: scrcpy reads it as "auto".
    args.assign(
        "--new-display",
        virtual_display
            .new_display
            .as_deref()
            .map(|spec| spec.trim()),
    );
    args.assign("--display-buffer", positive(virtual_display.buffer_ms));
    args.flag(
        "--no-vd-system-decorations",
        virtual_display.no_system_decorations,
    );
    args.flag("--no-vd-destroy-content", virtual_display.no_destroy_content);

    args.flag("--otg", options.otg);

    args.into_inner()
}

#[derive(Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn flag(&mut self, flag: &str, enabled: bool) {
        if enabled {
            self.0.push(flag.to_string());
        }
    }

    fn pair(&mut self, flag: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.0.push(flag.to_string());
            self.0.push(value.to_string());
        }
    }

    fn assign(&mut self, flag: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.0.push(format!("{flag}={}", value.to_string()));
        }
    }

    fn into_inner(self) -> Vec<String> {
        self.0
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scrcpy::options::{
        AudioCodec, AudioSource, CameraFacing, CropRect, InputMode, RecordFormat, VideoCodec,
        VideoSource,
    };

    type Setter = fn(&mut MirrorOptions);

    fn has_flag(args: &[String], flag: &str) -> bool {
        args.iter().any(|item| item == flag)
    }

    fn build_with(setter: impl FnOnce(&mut MirrorOptions)) -> Vec<String> {
        let mut options = MirrorOptions::default();
        setter(&mut options);
        build_scrcpy_args(&options)
    }

    struct Case {
        name: &'static str,
        setter: Setter,
        expected: &'static [&'static str],
    }

    fn case(name: &'static str, setter: Setter, expected: &'static [&'static str]) -> Case {
        Case {
            name,
            setter,
            expected,
        }
    }

    // Listed in the order the builder emits them.
    fn single_field_cases() -> Vec<Case> {
        vec![
            case("serial", |o| o.device.serial = Some("ABC123".into()), &["-s", "ABC123"]),
            case("select_usb", |o| o.device.select_usb = true, &["-d"]),
            case("select_tcpip", |o| o.device.select_tcpip = true, &["-e"]),
            case("tcpip", |o| o.device.tcpip = Some("192.168.1.5:5555".into()), &["--tcpip=192.168.1.5:5555"]),
            case("video_source", |o| o.video.source = Some(VideoSource::Camera), &["--video-source=camera"]),
            case("max_size", |o| o.video.max_size = Some(1024), &["-m", "1024"]),
            case("video_bit_rate", |o| o.video.bit_rate = Some("8M".into()), &["-b", "8M"]),
            case("max_fps", |o| o.video.max_fps = Some(60), &["--max-fps", "60"]),
            case("video_codec", |o| o.video.codec = Some(VideoCodec::H265), &["--video-codec=h265"]),
            case("video_encoder", |o| o.video.encoder = Some("OMX.google.h264.encoder".into()), &["--video-encoder=OMX.google.h264.encoder"]),
            case("capture_orientation", |o| o.video.capture_orientation = Some("@90".into()), &["--capture-orientation=@90"]),
            case("orientation", |o| o.video.orientation = Some("180".into()), &["--orientation=180"]),
            case("crop", |o| o.video.crop = Some(CropRect::new(1224, 1440).at(0, 100)), &["--crop=1224:1440:0:100"]),
            case("angle", |o| o.video.angle = Some("23".into()), &["--angle=23"]),
            case("display_id", |o| o.video.display_id = Some(2), &["--display-id=2"]),
            case("no_video", |o| o.video.disabled = true, &["--no-video"]),
            case("no_audio", |o| o.audio.disabled = true, &["--no-audio"]),
            case("audio_source", |o| o.audio.source = Some(AudioSource::Mic), &["--audio-source=mic"]),
            case("audio_codec", |o| o.audio.codec = Some(AudioCodec::Aac), &["--audio-codec=aac"]),
            case("audio_bit_rate", |o| o.audio.bit_rate = Some("128K".into()), &["--audio-bit-rate=128K"]),
            case("record", |o| o.recording.path = Some("/tmp/out.mp4".into()), &["--record=/tmp/out.mp4"]),
            case("record_format", |o| o.recording.format = Some(RecordFormat::Mkv), &["--record-format=mkv"]),
            case("time_limit", |o| o.recording.time_limit_secs = Some(30), &["--time-limit=30"]),
            case("no_playback", |o| o.recording.no_playback = true, &["--no-playback"]),
            case("no_window", |o| o.recording.no_window = true, &["--no-window"]),
            case("camera_id", |o| o.camera.id = Some("0".into()), &["--camera-id=0"]),
            case("camera_facing", |o| o.camera.facing = Some(CameraFacing::Front), &["--camera-facing=front"]),
            case("camera_size", |o| o.camera.size = Some("1920x1080".into()), &["--camera-size=1920x1080"]),
            case("window_title", |o| o.window.title = Some("Pixel".into()), &["--window-title=Pixel"]),
            case("window_x", |o| o.window.x = Some(0), &["--window-x=0"]),
            case("window_y", |o| o.window.y = Some(40), &["--window-y=40"]),
            case("window_width", |o| o.window.width = Some(800), &["--window-width=800"]),
            case("window_height", |o| o.window.height = Some(600), &["--window-height=600"]),
            case("window_borderless", |o| o.window.borderless = true, &["--window-borderless"]),
            case("always_on_top", |o| o.window.always_on_top = true, &["--always-on-top"]),
            case("fullscreen", |o| o.window.fullscreen = true, &["--fullscreen"]),
            case("disable_screensaver", |o| o.window.disable_screensaver = true, &["--disable-screensaver"]),
            case("no_control", |o| o.control.disabled = true, &["--no-control"]),
            case("keyboard", |o| o.control.keyboard = Some(InputMode::Uhid), &["--keyboard=uhid"]),
            case("mouse", |o| o.control.mouse = Some(InputMode::Sdk), &["--mouse=sdk"]),
            case("gamepad", |o| o.control.gamepad = Some(InputMode::Aoa), &["--gamepad=aoa"]),
            case("no_clipboard_autosync", |o| o.control.no_clipboard_autosync = true, &["--no-clipboard-autosync"]),
            case("turn_screen_off", |o| o.behavior.turn_screen_off = true, &["--turn-screen-off"]),
            case("stay_awake", |o| o.behavior.stay_awake = true, &["--stay-awake"]),
            case("show_touches", |o| o.behavior.show_touches = true, &["--show-touches"]),
            case("power_off_on_close", |o| o.behavior.power_off_on_close = true, &["--power-off-on-close"]),
            case("no_power_on", |o| o.behavior.no_power_on = true, &["--no-power-on"]),
            case("start_app", |o| o.behavior.start_app = Some("org.mozilla.firefox".into()), &["--start-app=org.mozilla.firefox"]),
            case("new_display", |o| o.virtual_display.new_display = Some("1920x1080/440".into()), &["--new-display=1920x1080/440"]),
            case("display_buffer", |o| o.virtual_display.buffer_ms = Some(50), &["--display-buffer=50"]),
            case("no_vd_system_decorations", |o| o.virtual_display.no_system_decorations = true, &["--no-vd-system-decorations"]),
            case("no_vd_destroy_content", |o| o.virtual_display.no_destroy_content = true, &["--no-vd-destroy-content"]),
            case("otg", |o| o.otg = true, &["--otg"]),
        ]
    }

    #[test]
    fn empty_options_produce_no_args() {
        assert!(build_scrcpy_args(&MirrorOptions::default()).is_empty());
    }

    #[test]
    fn each_field_in_isolation_produces_its_tokens() {
        for case in single_field_cases() {
            let args = build_with(case.setter);
            assert_eq!(args, case.expected, "field {}", case.name);
        }
    }

    #[test]
    fn field_pairs_do_not_interfere() {
        let cases = single_field_cases();
        for (i, first) in cases.iter().enumerate() {
            for second in cases.iter().skip(i + 1) {
                let args = build_with(|options| {
                    (first.setter)(options);
                    (second.setter)(options);
                });
                let expected: Vec<&str> = first
                    .expected
                    .iter()
                    .chain(second.expected.iter())
                    .copied()
                    .collect();
                assert_eq!(args, expected, "fields {} + {}", first.name, second.name);
            }
        }
    }

    #[test]
    fn crop_defaults_offsets_and_requires_height() {
        let args = build_with(|o| o.video.crop = Some(CropRect::new(100, 200)));
        assert_eq!(args, vec!["--crop=100:200:0:0"]);

        let args = build_with(|o| o.video.crop = Some(CropRect::new(100, 200).at(5, 10)));
        assert_eq!(args, vec!["--crop=100:200:5:10"]);

        let args = build_with(|o| {
            o.video.crop = Some(CropRect {
                width: Some(100),
                ..CropRect::default()
            })
        });
        assert!(args.is_empty());
    }

    #[test]
    fn default_codecs_and_source_are_suppressed() {
        let args = build_with(|o| {
            o.video.codec = Some(VideoCodec::H264);
            o.audio.codec = Some(AudioCodec::Opus);
            o.video.source = Some(VideoSource::Display);
        });
        assert!(args.is_empty());

        let args = build_with(|o| o.video.codec = Some(VideoCodec::Av1));
        assert!(has_flag(&args, "--video-codec=av1"));
        let args = build_with(|o| o.audio.codec = Some(AudioCodec::Flac));
        assert!(has_flag(&args, "--audio-codec=flac"));
    }

    #[test]
    fn empty_record_path_is_not_emitted() {
        let args = build_with(|o| {
            o.recording.path = Some(String::new());
            o.recording.format = Some(RecordFormat::Mp4);
        });
        assert_eq!(args, vec!["--record-format=mp4"]);
    }

    #[test]
    fn window_position_zero_is_explicit() {
        let args = build_with(|o| {
            o.window.x = Some(0);
            o.window.y = Some(0);
            o.window.width = Some(0);
        });
        assert_eq!(args, vec!["--window-x=0", "--window-y=0"]);
    }

    #[test]
    fn zero_sizes_and_buffers_are_unset() {
        let args = build_with(|o| {
            o.video.max_size = Some(0);
            o.video.max_fps = Some(0);
            o.recording.time_limit_secs = Some(0);
            o.virtual_display.buffer_ms = Some(0);
        });
        assert!(args.is_empty());
    }

    #[test]
    fn empty_virtual_display_spec_is_still_emitted() {
        let args = build_with(|o| o.virtual_display.new_display = Some(String::new()));
        assert_eq!(args, vec!["--new-display="]);
    }

    #[test]
    fn conflicting_modes_are_emitted_as_given() {
        let args = build_with(|o| {
            o.device.serial = Some("ABC".into());
            o.virtual_display.new_display = Some("1280x720".into());
            o.otg = true;
        });
        assert_eq!(args, vec!["-s", "ABC", "--new-display=1280x720", "--otg"]);
    }
}
