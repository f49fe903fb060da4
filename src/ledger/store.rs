use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{xlsx, Ledger};
use crate::error::{Result, YtdError};
use crate::runlog::RunLog;

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}.xlsx"))
}

/// `<stem>_backup_<YYYYMMDD_HHMMSS>.xlsx` next to the ledger.
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    with_suffix(path, &format!("_backup_{stamp}"))
}

/// Fallback name used when the ledger itself cannot be written.
pub fn formatted_path(path: &Path) -> PathBuf {
    with_suffix(path, "_formatted")
}

pub fn backup(path: &Path) -> Result<PathBuf> {
    let dest = backup_path(path);
    std::fs::copy(path, &dest)?;
    Ok(dest)
}

/// Write to a temp file in the target directory, then rename over the
/// target. A failed write leaves any existing file untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| YtdError::Io(e.error))?;
    Ok(())
}

/// Persist a ledger. The workbook is rendered in memory first, the existing
/// file is backed up when asked, and a failed write is retried once under
/// the `_formatted` name. Returns the path actually written.
pub fn save(ledger: &Ledger, path: &Path, make_backup: bool, log: &mut RunLog) -> Result<PathBuf> {
    let bytes = xlsx::render(ledger)?.save_to_buffer()?;

    if make_backup && path.exists() {
        match backup(path) {
            Ok(dest) => log.info(format!("Backup of current file saved as: {}", dest.display())),
            Err(e) => log.warn(format!("Could not create backup of {}: {e}", path.display())),
        }
    }

    match write_atomic(path, &bytes) {
        Ok(()) => {
            log.info(format!("Saved {}", path.display()));
            Ok(path.to_path_buf())
        }
        Err(first) => {
            log.warn(format!("Error saving {}: {first}", path.display()));
            let alt = formatted_path(path);
            match write_atomic(&alt, &bytes) {
                Ok(()) => {
                    log.info(format!("Saved as {}", alt.display()));
                    Ok(alt)
                }
                Err(second) => Err(YtdError::Persistence(format!(
                    "{} ({first}); {} ({second})",
                    path.display(),
                    alt.display()
                ))),
            }
        }
    }
}
