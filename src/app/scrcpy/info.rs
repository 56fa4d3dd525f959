use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use crate::app::adb::locator::{executable_name, normalize_command_path};
use crate::app::adb::runner::run_command_in;
use crate::app::config::ToolSettings;
use crate::app::error::AppError;
use crate::app::models::{ScrcpyInfo, ToolListing};

const DEFAULT_MAJOR_VERSION: i32 = 2;

/// Finds the scrcpy binary.
///
/// Order: explicit configured path, the binary inside `scrcpy_dir`, `scrcpy`
/// on `PATH` (probed with `--version`), then common install locations.
pub fn resolve_scrcpy_program(tools: &ToolSettings, scrcpy_dir: &Path) -> Option<String> {
    let configured = normalize_command_path(&tools.scrcpy_path);
    if !configured.is_empty() {
        return Some(configured);
    }
    let bundled = scrcpy_dir.join(executable_name("scrcpy"));
    if bundled.is_file() {
        return Some(bundled.to_string_lossy().into_owned());
    }
    if try_version("scrcpy").is_some() {
        return Some("scrcpy".to_string());
    }
    common_install_paths()
        .into_iter()
        .find(|path| path.is_file())
        .map(|path| path.to_string_lossy().into_owned())
}

pub fn check_scrcpy(tools: &ToolSettings, scrcpy_dir: &Path) -> ScrcpyInfo {
    let mut result = ScrcpyInfo {
        available: false,
        version_output: String::new(),
        major_version: DEFAULT_MAJOR_VERSION,
        command_path: "scrcpy".to_string(),
    };
    let Some(program) = resolve_scrcpy_program(tools, scrcpy_dir) else {
        return result;
    };
    result.command_path = program.clone();
    if let Some(output) = try_version(&program) {
        result.available = true;
        result.major_version = parse_scrcpy_major(&output);
        result.version_output = output;
    }
    result
}

fn common_install_paths() -> Vec<PathBuf> {
    let candidates: &[&str] = match std::env::consts::OS {
        "macos" => &[
            "/opt/homebrew/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "~/Applications/scrcpy.app/Contents/MacOS/scrcpy",
        ],
        "windows" => &["C:\\scrcpy\\scrcpy.exe", "~/scoop/shims/scrcpy.exe"],
        _ => &[
            "/usr/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "/snap/bin/scrcpy",
            "~/.local/bin/scrcpy",
            "/opt/scrcpy/scrcpy",
        ],
    };
    candidates.iter().map(|path| expand_home(path)).collect()
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn try_version(command: &str) -> Option<String> {
    let output = Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Major version from the `scrcpy X.Y <url>` banner, 2 when unknown.
pub fn parse_scrcpy_major(output: &str) -> i32 {
    Regex::new(r"(?i)scrcpy\s+v?(\d+)")
        .ok()
        .and_then(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .and_then(|major| major.as_str().parse::<i32>().ok())
        .unwrap_or(DEFAULT_MAJOR_VERSION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Displays,
    Cameras,
    Apps,
    Encoders,
}

impl ListKind {
    pub fn flag(self) -> &'static str {
        match self {
            ListKind::Displays => "--list-displays",
            ListKind::Cameras => "--list-cameras",
            ListKind::Apps => "--list-apps",
            ListKind::Encoders => "--list-encoders",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Displays => "displays",
            ListKind::Cameras => "cameras",
            ListKind::Apps => "apps",
            ListKind::Encoders => "encoders",
        }
    }
}

impl FromStr for ListKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "displays" => Ok(ListKind::Displays),
            "cameras" => Ok(ListKind::Cameras),
            "apps" => Ok(ListKind::Apps),
            "encoders" => Ok(ListKind::Encoders),
            other => Err(format!("Unknown listing: {other}")),
        }
    }
}

pub fn build_list_args(kind: ListKind, serial: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(serial) = serial.map(str::trim).filter(|value| !value.is_empty()) {
        args.push("-s".to_string());
        args.push(serial.to_string());
    }
    args.push(kind.flag().to_string());
    args
}

/// Runs one of scrcpy's `--list-*` queries and returns its text as-is.
pub fn run_listing(
    program: &str,
    kind: ListKind,
    serial: Option<&str>,
    working_dir: Option<&Path>,
    timeout: Duration,
    trace_id: &str,
) -> Result<ToolListing, AppError> {
    let args = build_list_args(kind, serial);
    info!(trace_id = %trace_id, kind = kind.as_str(), serial = ?serial, "scrcpy listing");
    let output = run_command_in(program, &args, working_dir, timeout, trace_id)?;
    if !output.success() {
        warn!(trace_id = %trace_id, kind = kind.as_str(), exit_code = ?output.exit_code, "scrcpy listing exited non-zero");
    }
    Ok(ToolListing {
        kind: kind.as_str().to_string(),
        serial: serial.map(|value| value.to_string()),
        output: output.combined(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_from_banner() {
        assert_eq!(
            parse_scrcpy_major("scrcpy 3.1 <https://github.com/Genymobile/scrcpy>"),
            3
        );
        assert_eq!(parse_scrcpy_major("scrcpy v2.4"), 2);
        assert_eq!(parse_scrcpy_major("Scrcpy 10.0.1"), 10);
        assert_eq!(parse_scrcpy_major("unexpected"), DEFAULT_MAJOR_VERSION);
    }

    #[test]
    fn list_args_prefix_serial() {
        assert_eq!(build_list_args(ListKind::Displays, None), vec!["--list-displays"]);
        assert_eq!(
            build_list_args(ListKind::Encoders, Some("emulator-5554")),
            vec!["-s", "emulator-5554", "--list-encoders"]
        );
        assert_eq!(build_list_args(ListKind::Apps, Some(" ")), vec!["--list-apps"]);
    }

    #[test]
    fn list_kind_parses_names() {
        assert_eq!("Cameras".parse::<ListKind>(), Ok(ListKind::Cameras));
        assert!("windows".parse::<ListKind>().is_err());
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tools = ToolSettings {
            scrcpy_path: "\"/opt/custom/scrcpy\"".to_string(),
            ..ToolSettings::default()
        };
        assert_eq!(
            resolve_scrcpy_program(&tools, dir.path()).as_deref(),
            Some("/opt/custom/scrcpy")
        );
    }

    #[cfg(unix)]
    #[test]
    fn listing_combines_stdout_and_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let program = crate::app::test_support::install_fake_tool(
            dir.path(),
            "scrcpy",
            "echo \"args: $*\"\necho 'cwd-marker' > marker.txt\necho '[server] INFO: List of displays:' >&2\n",
        );

        let listing = run_listing(
            &program.to_string_lossy(),
            ListKind::Displays,
            Some("emulator-5554"),
            Some(dir.path()),
            Duration::from_secs(5),
            "trace-list",
        )
        .expect("listing");

        assert_eq!(listing.kind, "displays");
        assert_eq!(
            listing.output,
            "args: -s emulator-5554 --list-displays\n[server] INFO: List of displays:\n"
        );
        assert!(dir.path().join("marker.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn slow_listing_times_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let program =
            crate::app::test_support::install_fake_tool(dir.path(), "scrcpy", "sleep 10\n");

        let err = run_listing(
            &program.to_string_lossy(),
            ListKind::Apps,
            None,
            None,
            Duration::from_millis(300),
            "trace-slow",
        )
        .expect_err("expected timeout");
        assert_eq!(err.code, "ERR_TIMEOUT");
    }
}
