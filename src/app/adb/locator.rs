use std::path::Path;

use crate::app::config::ToolSettings;

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

/// Platform file name of a bundled tool (`adb` / `adb.exe`).
pub fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// Configured path, else the adb shipped inside the scrcpy release, else
/// `adb` from `PATH`.
pub fn resolve_adb_program(tools: &ToolSettings, scrcpy_dir: &Path) -> String {
    let configured = normalize_command_path(&tools.adb_path);
    if !configured.is_empty() {
        return configured;
    }
    let bundled = scrcpy_dir.join(executable_name("adb"));
    if bundled.is_file() {
        return bundled.to_string_lossy().into_owned();
    }
    "adb".to_string()
}

/// Bare names are left to the `PATH` lookup at spawn time.
pub fn validate_program(program: &str, label: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err(format!("{label} command is empty"));
    }
    let path = Path::new(program);
    if path.components().count() == 1 && !path.is_absolute() {
        return Ok(());
    }
    if path.is_dir() {
        return Err(format!("{label} path must point to an executable file"));
    }
    if !path.exists() {
        return Err(format!("{label} executable not found at the configured path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wrapping_double_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/android/platform-tools/adb\"  "),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn strips_wrapping_single_quotes() {
        assert_eq!(
            normalize_command_path("  '/opt/android/platform-tools/adb'  "),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn resolves_empty_to_path_adb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tools = ToolSettings::default();
        assert_eq!(resolve_adb_program(&tools, dir.path()), "adb");
    }

    #[test]
    fn prefers_configured_then_bundled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundled = dir.path().join(executable_name("adb"));
        std::fs::write(&bundled, b"").expect("write bundled adb");

        let tools = ToolSettings::default();
        assert_eq!(
            resolve_adb_program(&tools, dir.path()),
            bundled.to_string_lossy()
        );

        let tools = ToolSettings {
            adb_path: "'/opt/platform-tools/adb'".to_string(),
            ..ToolSettings::default()
        };
        assert_eq!(
            resolve_adb_program(&tools, dir.path()),
            "/opt/platform-tools/adb"
        );
    }

    #[test]
    fn validates_nonexistent_path() {
        let err = validate_program("/this/path/should/not/exist/adb", "ADB").unwrap_err();
        assert!(err.to_lowercase().contains("not found"));
        assert!(validate_program("adb", "ADB").is_ok());
        assert!(validate_program("  ", "ADB").is_err());
    }

    #[test]
    fn rejects_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = validate_program(&dir.path().to_string_lossy(), "scrcpy").unwrap_err();
        assert!(err.contains("executable file"));
    }
}
