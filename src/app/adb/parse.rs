use crate::app::models::{ConnectionKind, DeviceRecord, DeviceStatus};

/// Parses `adb devices -l`.
///
/// The first line is always the `List of devices attached` header and is
/// dropped. Daemon notices (`* daemon started successfully`) and devices in
/// transitional states are skipped.
pub fn parse_adb_devices(output: &str) -> Vec<DeviceRecord> {
    output
        .trim()
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            let serial = tokens[0].to_string();
            let status = DeviceStatus::parse(tokens[1])?;
            let mut model = None;
            let mut product = None;
            for token in tokens.iter().skip(2) {
                if let Some(value) = token.strip_prefix("model:") {
                    model = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("product:") {
                    product = Some(value.to_string());
                }
            }
            let model = model
                .filter(|value| !value.is_empty())
                .or(product.filter(|value| !value.is_empty()))
                .unwrap_or_else(|| serial.clone());
            Some(DeviceRecord {
                connection_kind: ConnectionKind::from_serial(&serial),
                serial,
                status,
                model,
            })
        })
        .collect()
}

/// `adb connect` exits 0 even when the connection is refused, so the text
/// decides once the exit code is clean.
pub fn connect_succeeded(exit_code: Option<i32>, output: &str) -> bool {
    if exit_code != Some(0) {
        return false;
    }
    let lower = output.to_lowercase();
    lower.contains("connected") && !lower.contains("failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "List of devices attached\n\
emulator-5554          device product:sdk_gphone model:sdk_gphone64 serial:emulator-5554\n\
unauthorized-dev       unauthorized\n\
\n\
192.168.1.5:5555       device product:redfin device:redfin transport_id:4\n\
0123456789ABCDEF       offline\n";

    #[test]
    fn parses_records_and_drops_header() {
        let devices = parse_adb_devices(LISTING);
        assert_eq!(devices.len(), 3);

        assert_eq!(
            devices[0],
            DeviceRecord {
                serial: "emulator-5554".to_string(),
                status: DeviceStatus::Device,
                model: "sdk_gphone64".to_string(),
                connection_kind: ConnectionKind::Usb,
            }
        );
        assert_eq!(devices[1].status, DeviceStatus::Unauthorized);
        assert_eq!(devices[1].model, "unauthorized-dev");
        assert_eq!(devices[2].connection_kind, ConnectionKind::Wireless);
        assert_eq!(devices[2].model, "redfin");
    }

    #[test]
    fn skips_daemon_notices_and_empty_output() {
        let output = "* daemon not running; starting now at tcp:5037\n\
* daemon started successfully\n\
List of devices attached\n\
R58M123456A device usb:1-1 product:beyond1 model:SM_G973F device:beyond1\n";
        // The first line is dropped unconditionally; notices are skipped as well.
        let devices = parse_adb_devices(output);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model, "SM_G973F");

        assert!(parse_adb_devices("").is_empty());
        assert!(parse_adb_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn connect_detects_success_text() {
        assert!(connect_succeeded(Some(0), "connected to 192.168.1.5:5555\n"));
        assert!(connect_succeeded(Some(0), "already connected to 192.168.1.5:5555"));
    }

    #[test]
    fn connect_failure_text_wins_over_connect_substring() {
        assert!(!connect_succeeded(
            Some(0),
            "failed to connect to '192.168.1.5:5555': Connection refused"
        ));
        assert!(!connect_succeeded(
            Some(0),
            "cannot connect to 10.0.0.2:5555: No route to host"
        ));
    }

    #[test]
    fn connect_nonzero_exit_is_failure() {
        assert!(!connect_succeeded(Some(1), "connected to 192.168.1.5:5555"));
        assert!(!connect_succeeded(None, "connected to 192.168.1.5:5555"));
    }
}
