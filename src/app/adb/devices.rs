use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::adb::parse::{connect_succeeded, parse_adb_devices};
use crate::app::adb::runner::{run_command_with_timeout, CommandOutput};
use crate::app::error::{AppError, ERR_SPAWN};
use crate::app::models::{BridgeActionResult, DeviceRecord, HostCommandResult};

/// Keys exposed as navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Back,
    Home,
    AppSwitch,
}

impl NavKey {
    pub fn keycode(self) -> u32 {
        match self {
            NavKey::Back => 4,
            NavKey::Home => 3,
            NavKey::AppSwitch => 187,
        }
    }
}

impl FromStr for NavKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "back" => Ok(NavKey::Back),
            "home" => Ok(NavKey::Home),
            "app-switch" | "app_switch" | "recents" => Ok(NavKey::AppSwitch),
            other => Err(format!("Unknown key: {other}")),
        }
    }
}

/// Thin wrapper over the adb CLI. Every call is a one-shot, bounded
/// subprocess; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    program: String,
    timeout: Duration,
    default_port: u16,
}

impl DeviceDirectory {
    pub fn new(program: impl Into<String>, timeout: Duration, default_port: u16) -> Self {
        Self {
            program: program.into(),
            timeout,
            default_port,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn list_devices(&self, trace_id: &str) -> Result<Vec<DeviceRecord>, AppError> {
        let args = vec!["devices".to_string(), "-l".to_string()];
        let output = self.run(&args, trace_id)?;
        if !output.success() {
            let detail = output.combined().trim().to_string();
            warn!(trace_id = %trace_id, exit_code = ?output.exit_code, "adb devices failed");
            return Err(AppError::bridge(
                if detail.is_empty() {
                    format!("adb devices exited with {:?}", output.exit_code)
                } else {
                    detail
                },
                trace_id,
            ));
        }
        let devices = parse_adb_devices(&output.stdout);
        info!(trace_id = %trace_id, count = devices.len(), "listed devices");
        Ok(devices)
    }

    /// `host` may already carry a port; `port` wins when both are given.
    pub fn connect_tcpip(
        &self,
        host: &str,
        port: Option<u16>,
        trace_id: &str,
    ) -> Result<BridgeActionResult, AppError> {
        let address = self.format_address(host, port, trace_id)?;
        let output = self.run(&["connect".to_string(), address.clone()], trace_id)?;
        let message = output.combined().trim().to_string();
        if !connect_succeeded(output.exit_code, &message) {
            warn!(trace_id = %trace_id, address = %address, exit_code = ?output.exit_code, "adb connect failed");
            let message = if message.is_empty() {
                format!("Failed to connect to {address}")
            } else {
                message
            };
            return Err(AppError::connect_failed(message, trace_id));
        }
        info!(trace_id = %trace_id, address = %address, "adb connected");
        Ok(BridgeActionResult {
            success: true,
            address,
            message,
        })
    }

    pub fn disconnect_tcpip(
        &self,
        address: &str,
        trace_id: &str,
    ) -> Result<BridgeActionResult, AppError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AppError::validation("address is required", trace_id));
        }
        let output = self.run(&["disconnect".to_string(), address.to_string()], trace_id)?;
        let success = output.success();
        info!(trace_id = %trace_id, address = %address, success, "adb disconnect");
        Ok(BridgeActionResult {
            success,
            address: address.to_string(),
            message: output.combined().trim().to_string(),
        })
    }

    pub fn send_key_event(
        &self,
        serial: Option<&str>,
        keycode: u32,
        trace_id: &str,
    ) -> Result<HostCommandResult, AppError> {
        let mut args = Vec::new();
        if let Some(serial) = serial.map(str::trim).filter(|value| !value.is_empty()) {
            args.push("-s".to_string());
            args.push(serial.to_string());
        }
        args.extend([
            "shell".to_string(),
            "input".to_string(),
            "keyevent".to_string(),
            keycode.to_string(),
        ]);
        let output = self.run(&args, trace_id)?;
        if !output.success() {
            return Err(AppError::bridge(
                format!("keyevent {keycode} failed: {}", output.combined().trim()),
                trace_id,
            ));
        }
        Ok(HostCommandResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        })
    }

    fn format_address(
        &self,
        host: &str,
        port: Option<u16>,
        trace_id: &str,
    ) -> Result<String, AppError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(AppError::validation("host is required", trace_id));
        }
        Ok(match port {
            Some(port) => format!("{}:{port}", host.split(':').next().unwrap_or(host)),
            None if host.contains(':') => host.to_string(),
            None => format!("{host}:{}", self.default_port),
        })
    }

    fn run(&self, args: &[String], trace_id: &str) -> Result<CommandOutput, AppError> {
        info!(trace_id = %trace_id, program = %self.program, args = ?args, "adb");
        run_command_with_timeout(&self.program, args, self.timeout, trace_id).map_err(|err| {
            if err.is(ERR_SPAWN) {
                AppError::bridge(err.error, trace_id)
            } else {
                err
            }
        })
    }
}

/// Re-resolves the selected serial after a refresh.
pub fn reconcile_selection(
    previous: Option<&str>,
    devices: &[DeviceRecord],
    auto_select_first: bool,
) -> Option<String> {
    if let Some(serial) = previous {
        if devices.iter().any(|device| device.serial == serial) {
            return Some(serial.to_string());
        }
    }
    if auto_select_first {
        return devices.first().map(|device| device.serial.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{ConnectionKind, DeviceStatus};

    fn record(serial: &str) -> DeviceRecord {
        DeviceRecord {
            serial: serial.to_string(),
            status: DeviceStatus::Device,
            model: serial.to_string(),
            connection_kind: ConnectionKind::from_serial(serial),
        }
    }

    #[test]
    fn missing_adb_is_a_bridge_error_for_every_call() {
        let directory = DeviceDirectory::new(
            "/this/path/should/not/exist/adb",
            Duration::from_secs(1),
            5555,
        );
        let errors = [
            directory.list_devices("trace-missing").map(|_| ()),
            directory
                .connect_tcpip("192.168.1.5", None, "trace-missing")
                .map(|_| ()),
            directory
                .disconnect_tcpip("192.168.1.5:5555", "trace-missing")
                .map(|_| ()),
            directory
                .send_key_event(Some("ABC"), NavKey::Home.keycode(), "trace-missing")
                .map(|_| ()),
        ];
        for result in errors {
            let err = result.expect_err("expected bridge error");
            assert_eq!(err.code, "ERR_BRIDGE");
            assert_eq!(err.trace_id, "trace-missing");
        }
    }

    #[test]
    fn nav_keys_map_to_android_keycodes() {
        assert_eq!(NavKey::Back.keycode(), 4);
        assert_eq!(NavKey::Home.keycode(), 3);
        assert_eq!(NavKey::AppSwitch.keycode(), 187);
        assert_eq!("recents".parse::<NavKey>(), Ok(NavKey::AppSwitch));
        assert!("volume".parse::<NavKey>().is_err());
    }

    #[test]
    fn address_uses_default_port_only_when_missing() {
        let directory = DeviceDirectory::new("adb", Duration::from_secs(1), 5555);
        assert_eq!(
            directory.format_address("192.168.1.5", None, "t").unwrap(),
            "192.168.1.5:5555"
        );
        assert_eq!(
            directory.format_address("192.168.1.5:5000", None, "t").unwrap(),
            "192.168.1.5:5000"
        );
        assert_eq!(
            directory.format_address("192.168.1.5:5000", Some(5001), "t").unwrap(),
            "192.168.1.5:5001"
        );
        let err = directory.format_address("  ", None, "t").unwrap_err();
        assert_eq!(err.code, "ERR_VALIDATION");
    }

    #[test]
    fn selection_survives_refresh_when_present() {
        let devices = vec![record("a"), record("b")];
        assert_eq!(
            reconcile_selection(Some("b"), &devices, true),
            Some("b".to_string())
        );
    }

    #[test]
    fn selection_is_cleared_or_replaced_when_missing() {
        let devices = vec![record("a")];
        assert_eq!(reconcile_selection(Some("gone"), &devices, false), None);
        assert_eq!(
            reconcile_selection(Some("gone"), &devices, true),
            Some("a".to_string())
        );
        assert_eq!(reconcile_selection(None, &[], true), None);
    }

    #[cfg(unix)]
    mod fake_adb {
        use super::*;
        use crate::app::test_support::install_fake_tool;
        use std::path::{Path, PathBuf};

        const SCRIPT: &str = r#"echo "$@" >> "$(dirname "$0")/calls.log"
case "$1" in
  devices)
    echo "List of devices attached"
    echo "emulator-5554 device product:sdk_gphone model:sdk_gphone64 serial:emulator-5554"
    echo "10.0.0.7:5555 unauthorized"
    echo "ZX1G22 offline"
    ;;
  connect)
    case "$2" in
      10.0.0.7:*) echo "connected to $2" ;;
      *) echo "failed to connect to '$2': Connection refused" ;;
    esac
    ;;
  disconnect)
    case "$2" in
      10.0.0.7:*) echo "disconnected $2" ;;
      *) echo "error: no such device '$2'" >&2; exit 1 ;;
    esac
    ;;
esac
"#;

        fn install(dir: &Path) -> PathBuf {
            install_fake_tool(dir, "adb", SCRIPT)
        }

        fn directory(path: &Path) -> DeviceDirectory {
            DeviceDirectory::new(path.to_string_lossy(), Duration::from_secs(5), 5555)
        }

        fn calls(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(|line| line.to_string())
                .collect()
        }

        #[test]
        fn lists_devices_from_fake_bridge() {
            let dir = tempfile::tempdir().expect("tempdir");
            let adb = install(dir.path());

            let devices = directory(&adb).list_devices("trace-list").expect("devices");

            assert_eq!(devices.len(), 2);
            assert_eq!(devices[0].model, "sdk_gphone64");
            assert_eq!(devices[1].status, DeviceStatus::Unauthorized);
            assert_eq!(devices[1].connection_kind, ConnectionKind::Wireless);
            assert_eq!(calls(dir.path()), vec!["devices -l"]);
        }

        #[test]
        fn connect_reports_success_and_refusal() {
            let dir = tempfile::tempdir().expect("tempdir");
            let adb = install(dir.path());
            let directory = directory(&adb);

            let ok = directory
                .connect_tcpip("10.0.0.7", None, "trace-connect")
                .expect("connected");
            assert!(ok.success);
            assert_eq!(ok.address, "10.0.0.7:5555");
            assert_eq!(ok.message, "connected to 10.0.0.7:5555");

            let err = directory
                .connect_tcpip("10.0.0.8", Some(5000), "trace-refused")
                .expect_err("refused");
            assert_eq!(err.code, "ERR_CONNECT");
            assert!(err.error.contains("Connection refused"));
        }

        #[test]
        fn disconnect_follows_exit_code() {
            let dir = tempfile::tempdir().expect("tempdir");
            let adb = install(dir.path());
            let directory = directory(&adb);

            let ok = directory
                .disconnect_tcpip("10.0.0.7:5555", "trace-1")
                .expect("disconnect");
            assert!(ok.success);

            let missing = directory
                .disconnect_tcpip("10.0.0.9:5555", "trace-2")
                .expect("disconnect result");
            assert!(!missing.success);
            assert!(missing.message.contains("no such device"));
        }

        #[test]
        fn key_event_targets_serial() {
            let dir = tempfile::tempdir().expect("tempdir");
            let adb = install(dir.path());

            directory(&adb)
                .send_key_event(Some("emulator-5554"), NavKey::Home.keycode(), "trace-key")
                .expect("key event");
            directory(&adb)
                .send_key_event(None, NavKey::Back.keycode(), "trace-key")
                .expect("key event");

            assert_eq!(
                calls(dir.path()),
                vec![
                    "-s emulator-5554 shell input keyevent 3",
                    "shell input keyevent 4"
                ]
            );
        }
    }
}
