use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};
use zip::read::ZipArchive;

use crate::app::config::BootstrapSettings;
use crate::app::error::AppError;
use crate::app::models::{BootstrapResult, DownloadProgress};

const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads the scrcpy release archive and unpacks it into `target_dir`.
pub fn bootstrap_scrcpy(
    settings: &BootstrapSettings,
    target_dir: &Path,
    on_progress: &dyn Fn(DownloadProgress),
    trace_id: &str,
) -> Result<BootstrapResult, AppError> {
    let url = settings.download_url();
    fs::create_dir_all(target_dir).map_err(|err| {
        AppError::system(format!("Failed to create {}: {err}", target_dir.display()), trace_id)
    })?;

    let mut archive = tempfile::Builder::new()
        .prefix("scrcpy-")
        .suffix(".zip")
        .tempfile()
        .map_err(|err| AppError::system(format!("Failed to create temp file: {err}"), trace_id))?;

    info!(trace_id = %trace_id, url = %url, target = %target_dir.display(), "downloading scrcpy");
    let bytes = download(&url, settings.max_redirects, archive.as_file_mut(), on_progress, trace_id)?;

    archive
        .as_file_mut()
        .rewind()
        .map_err(|err| AppError::system(format!("Failed to rewind archive: {err}"), trace_id))?;
    let extracted_files = extract_flat(archive.as_file_mut(), target_dir, trace_id)?;
    info!(
        trace_id = %trace_id,
        bytes,
        files = extracted_files.len(),
        "scrcpy unpacked"
    );

    Ok(BootstrapResult {
        url,
        target_dir: target_dir.to_string_lossy().into_owned(),
        bytes,
        extracted_files,
    })
}

fn download(
    url: &str,
    max_redirects: u32,
    dest: &mut File,
    on_progress: &dyn Fn(DownloadProgress),
    trace_id: &str,
) -> Result<u64, AppError> {
    let agent = ureq::AgentBuilder::new()
        .redirects(max_redirects)
        .timeout_connect(Duration::from_secs(15))
        .timeout_read(Duration::from_secs(60))
        .build();

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            warn!(trace_id = %trace_id, url = %url, status = code, "download rejected");
            return Err(AppError::dependency(
                format!("Download failed: HTTP {code}"),
                trace_id,
            ));
        }
        Err(ureq::Error::Transport(err)) => {
            warn!(trace_id = %trace_id, url = %url, error = %err, "download failed");
            return Err(AppError::dependency(
                format!("Download failed: {err}"),
                trace_id,
            ));
        }
    };
    // Redirects are followed by the agent; anything else but 200 is a failure.
    if response.status() != 200 {
        return Err(AppError::dependency(
            format!("Download failed: HTTP {}", response.status()),
            trace_id,
        ));
    }

    let total = response
        .header("Content-Length")
        .and_then(|value| value.trim().parse::<u64>().ok());
    let mut reader = response.into_reader();
    copy_with_progress(&mut reader, dest, total, on_progress)
        .map_err(|err| AppError::dependency(format!("Download interrupted: {err}"), trace_id))
}

pub fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: Option<u64>,
    on_progress: &dyn Fn(DownloadProgress),
) -> io::Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut downloaded = 0u64;
    loop {
        let count = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        writer.write_all(&buffer[..count])?;
        downloaded += count as u64;
        on_progress(progress(downloaded, total));
    }
    writer.flush()?;
    Ok(downloaded)
}

fn progress(downloaded: u64, total: Option<u64>) -> DownloadProgress {
    let percent = total
        .filter(|total| *total > 0)
        .map(|total| ((downloaded.saturating_mul(100) / total).min(100)) as u8);
    DownloadProgress {
        downloaded,
        total,
        percent,
    }
}

/// Writes every file entry into `target_dir` by its base name, dropping the
/// archive's folder structure.
pub fn extract_flat<R: Read + Seek>(
    reader: R,
    target_dir: &Path,
    trace_id: &str,
) -> Result<Vec<String>, AppError> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|err| AppError::dependency(format!("Invalid scrcpy archive: {err}"), trace_id))?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| AppError::dependency(format!("Invalid archive entry: {err}"), trace_id))?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let Some(file_name) = base_name(&entry_name) else {
            continue;
        };
        let dest = target_dir.join(file_name);
        let mut out = File::create(&dest).map_err(|err| {
            AppError::system(format!("Failed to create {}: {err}", dest.display()), trace_id)
        })?;
        io::copy(&mut entry, &mut out).map_err(|err| {
            AppError::system(format!("Failed to extract {entry_name}: {err}"), trace_id)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                if let Err(err) = fs::set_permissions(&dest, fs::Permissions::from_mode(mode & 0o777)) {
                    warn!(
                        trace_id = %trace_id,
                        file = %dest.display(),
                        error = %err,
                        "failed to restore file mode"
                    );
                }
            }
        }

        extracted.push(file_name.to_string());
    }

    Ok(extracted)
}

fn base_name(entry_name: &str) -> Option<&str> {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}
