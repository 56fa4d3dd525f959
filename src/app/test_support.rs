use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Writes an executable shell script named `name` into `dir`.
///
/// The script exits immediately when `FAKE_TOOL_PROBE` is set, which is how
/// the helper checks that it can be exec'd.
pub fn install_fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!("#!/bin/sh\n[ -n \"$FAKE_TOOL_PROBE\" ] && exit 0\n{body}");
    std::fs::write(&path, script).expect("write fake tool");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    wait_until_runnable(&path);
    path
}

// ETXTBSY: another test thread may have forked while the script was still
// open for writing; the inherited fd goes away once that child execs.
fn wait_until_runnable(path: &Path) {
    for _ in 0..50 {
        match Command::new(path)
            .env("FAKE_TOOL_PROBE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Err(err) if err.raw_os_error() == Some(26) => {
                std::thread::sleep(Duration::from_millis(20));
            }
            _ => return,
        }
    }
}
